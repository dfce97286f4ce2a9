//! winget 退出码分类
//!
//! winget 以 HRESULT 形式返回错误（0x8A15xxxx 等），按有符号 32 位整数看全部是负数。

use super::types::{Outcome, OutcomeCategory, SENTINEL_EXIT_CODE};

/// 表示“没有可升级内容”的退出码，upgrade 失败时据此判断无需再 install
pub const NO_UPGRADE_NEEDED: [i32; 4] = [-1978335189, -1978335135, -1978334963, -1978334962];

/// 表示“目标已安装”的退出码
pub const ALREADY_INSTALLED: [i32; 2] = [-1978335135, -1978334963];

const MESSAGES: &[(i32, &str)] = &[
    (0, "OK"),
    (-1978335231, "Internal error"),
    (-1978335230, "Invalid arguments"),
    (-1978335229, "Command failed"),
    (-1978335228, "Opening manifest failed"),
    (-1978335227, "Cancelled"),
    (-1978335226, "ShellExecute failed"),
    (-1978335225, "Unsupported manifest version"),
    (-1978335224, "Download failed"),
    (-1978335222, "Corrupted index"),
    (-1978335221, "Invalid sources"),
    (-1978335220, "Source name already exists"),
    (-1978335219, "Invalid source type"),
    (-1978335217, "Source data missing"),
    (-1978335216, "No applicable installer"),
    (-1978335215, "Installer hash mismatch"),
    (-1978335214, "Source name does not exist"),
    (-1978335212, "Package not found"),
    (-1978335211, "No sources configured"),
    (-1978335210, "Multiple packages found"),
    (-1978335209, "Manifest not found"),
    (-1978335207, "Administrator privileges required"),
    (-1978335205, "Microsoft Store blocked by policy"),
    (-1978335204, "Microsoft Store app blocked by policy"),
    (-1978335203, "Experimental feature disabled"),
    (-1978335202, "Microsoft Store install failed"),
    (-1978335191, "Manifest validation failed"),
    (-1978335190, "Invalid manifest"),
    (-1978335189, "No applicable upgrade"),
    (-1978335188, "Upgrade --all completed with failures"),
    (-1978335187, "Security check failed"),
    (-1978335186, "Download size mismatch"),
    (-1978335185, "Uninstall information missing"),
    (-1978335184, "Uninstall failed"),
    (-1978335180, "Import install failed"),
    (-1978335179, "Not all packages found"),
    (-1978335174, "Blocked by policy"),
    (-1978335173, "REST API error"),
    (-1978335163, "Opening source failed"),
    (-1978335157, "Opening sources failed"),
    (-1978335153, "Upgrade version is not newer"),
    (-1978335150, "Portable install failed"),
    (-1978335147, "Portable package already exists"),
    (-1978335146, "Installer prohibits elevation"),
    (-1978335145, "Portable uninstall failed"),
    (-1978335141, "Nested installer not found"),
    (-1978335140, "Archive extraction failed"),
    (-1978335137, "Install location required"),
    (-1978335136, "Archive malware scan failed"),
    (-1978335135, "Already installed"),
    (-1978335131, "One or more installs failed"),
    (-1978335130, "One or more uninstalls failed"),
    (-1978335128, "Blocked by pin"),
    (-1978335127, "Stub package"),
    (-1978335125, "Dependency download failed"),
    (-1978335123, "Service unavailable"),
    (-1978335115, "Authentication failed"),
    (-1978335111, "Repair information missing"),
    (-1978335109, "Repair failed"),
    (-1978335108, "Repair not supported"),
    (-1978335098, "Zero-byte installer"),
    (-1978334975, "Application in use"),
    (-1978334974, "Another installation in progress"),
    (-1978334973, "File in use"),
    (-1978334972, "Missing dependency"),
    (-1978334971, "Disk full"),
    (-1978334970, "Insufficient memory"),
    (-1978334969, "Network required"),
    (-1978334968, "Contact support"),
    (-1978334967, "Reboot required to finish"),
    (-1978334966, "Reboot required to install"),
    (-1978334965, "Reboot initiated"),
    (-1978334964, "Cancelled by user"),
    (-1978334963, "Another version already installed"),
    (-1978334962, "Higher version already installed"),
    (-1978334961, "Blocked by policy"),
    (-1978334960, "Dependencies failed"),
    (-1978334959, "Package in use by another application"),
    (-1978334958, "Invalid parameter"),
    (-1978334957, "System not supported"),
    (-1978334956, "Upgrade not supported"),
    (-1978334955, "Custom installer error"),
    (-2145844844, "Installer error"),
    (-2147023673, "Operation cancelled by user"),
    (SENTINEL_EXIT_CODE, "Execution failed"),
];

pub fn is_no_upgrade_needed(code: i32) -> bool {
    NO_UPGRADE_NEEDED.contains(&code)
}

pub fn is_already_installed(code: i32) -> bool {
    ALREADY_INSTALLED.contains(&code)
}

/// 退出码对应的简短说明；未收录的退出码返回 `error (<code>)`
pub fn message(code: i32) -> String {
    MESSAGES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, text)| text.to_string())
        .unwrap_or_else(|| format!("error ({})", code))
}

pub fn classify(code: i32) -> Outcome {
    // 两个集合有交集，交集中的退出码按“已安装”归类
    let category = if code == 0 {
        OutcomeCategory::Success
    } else if is_already_installed(code) {
        OutcomeCategory::AlreadyInstalled
    } else if is_no_upgrade_needed(code) {
        OutcomeCategory::AlreadyUpToDate
    } else {
        OutcomeCategory::Failure
    };

    Outcome {
        category,
        message: message(code),
    }
}
