use thiserror::Error;

/// Unified error type for sysmon.
#[derive(Debug, Error)]
pub enum SysmonError {
    /// The OS metrics backend returned nothing usable this round.
    #[error("metrics source unavailable: {0}")]
    SourceUnavailable(&'static str),

    #[error("monitor process {pid} not found by the metrics source")]
    ProcessNotFound { pid: u32 },
}

pub type Result<T> = std::result::Result<T, SysmonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        assert_eq!(
            SysmonError::SourceUnavailable("no CPUs reported").to_string(),
            "metrics source unavailable: no CPUs reported"
        );
        assert_eq!(
            SysmonError::ProcessNotFound { pid: 42 }.to_string(),
            "monitor process 42 not found by the metrics source"
        );
    }
}
