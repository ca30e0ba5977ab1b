/// 调度运行时配置
#[derive(Clone, Copy, Debug)]
pub struct OperationsConfig {
    /// 是否输出非错误级日志；关闭后调度过程仅保留 error 级记录
    pub enable_non_error_logging: bool,
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            enable_non_error_logging: true,
        }
    }
}
