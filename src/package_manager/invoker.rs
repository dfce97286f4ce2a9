//! 外部命令调用（winget 等包管理器 CLI）
//!
//! 非零退出码是正常的业务结果（例如包不存在），不作为错误返回；
//! 只有进程无法启动时才返回哨兵结果 [`SENTINEL_EXIT_CODE`](super::types::SENTINEL_EXIT_CODE)。

use super::types::{CommandResult, Flag};

/// 命令执行抽象，便于在测试中替换为脚本化的实现
pub trait Invoker: Send + Sync {
    fn invoke(&self, command: &str, flags: &[Flag]) -> CommandResult;
}

/// 构造参数列表：命令在前，随后按顺序追加 flag 及其非空值
pub fn build_args(command: &str, flags: &[Flag]) -> Vec<String> {
    let mut args = vec![command.to_string()];
    for flag in flags {
        args.push(flag.name.clone());
        if let Some(value) = flag.value.as_deref() {
            if !value.trim().is_empty() {
                args.push(value.to_string());
            }
        }
    }
    args
}

/// 基于子进程的真实实现
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    program: String,
}

impl ProcessInvoker {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    fn run(&self, args: &[String]) -> CommandResult {
        let expr = duct::cmd(self.program.as_str(), args.iter())
            .stdin_null()
            .stdout_capture()
            .stderr_capture()
            .unchecked();

        // 父进程退出时让子进程收到 SIGTERM，避免遗留孤儿进程
        #[cfg(target_os = "linux")]
        let expr = expr.before_spawn(|cmd| {
            use std::os::unix::process::CommandExt;
            unsafe {
                cmd.pre_exec(|| {
                    libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                    Ok(())
                });
            }
            Ok(())
        });

        let output = match expr.run() {
            Ok(output) => output,
            Err(e) => {
                log::warn!("无法启动 {}: {}", self.program, e);
                return CommandResult::spawn_failed();
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = if stderr.trim().is_empty() {
            stdout.to_string()
        } else {
            format!("{}\n{}", stdout.trim_end(), stderr)
        };

        // 被信号终止时没有退出码
        let exit_code = output.status.code().unwrap_or(-1);
        log::debug!("{} {:?} -> {}", self.program, args, exit_code);

        CommandResult {
            exit_code,
            output: combined.trim().to_string(),
        }
    }
}

impl Invoker for ProcessInvoker {
    fn invoke(&self, command: &str, flags: &[Flag]) -> CommandResult {
        let args = build_args(command, flags);
        self.run(&args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package_manager::types::SENTINEL_EXIT_CODE;

    #[test]
    fn args_keep_flag_order_and_skip_blank_values() {
        let flags = vec![
            Flag::with_value("--id", "Git.Git"),
            Flag::switch("--exact"),
            Flag::with_value("--source", "   "),
            Flag::with_value("--query", "git"),
        ];
        assert_eq!(
            build_args("install", &flags),
            vec!["install", "--id", "Git.Git", "--exact", "--source", "--query", "git"]
        );
    }

    #[test]
    fn command_without_flags_is_single_token() {
        assert_eq!(build_args("--version", &[]), vec!["--version"]);
    }

    #[test]
    fn missing_program_yields_sentinel() {
        let invoker = ProcessInvoker::new("onlywinget-no-such-tool-7f3a");
        let result = invoker.invoke("--version", &[]);
        assert_eq!(result.exit_code, SENTINEL_EXIT_CODE);
        assert!(!result.success());
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_a_result_and_stderr_is_appended() {
        let invoker = ProcessInvoker::new("sh");
        let result = invoker.invoke(
            "-c",
            &[Flag::switch("echo out; echo err >&2; exit 3")],
        );
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.output, "out\nerr");
    }
}
