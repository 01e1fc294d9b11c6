use thiserror::Error;

use crate::my_types::ImageShape;

/// Broken assumptions about what an adapter receives or returns.
#[derive(Debug, Error, PartialEq)]
pub enum ContractViolation {
    #[error(
        "flow returned {positions} positions, {status} status flags and {errors} errors \
         for {expected} input points"
    )]
    FlowLength {
        expected: usize,
        positions: usize,
        status: usize,
        errors: usize,
    },

    #[error("frame shape {actual:?} differs from the previous frame shape {expected:?}")]
    DegenerateFrame {
        expected: ImageShape,
        actual: ImageShape,
    },
}

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("adapter contract violation: {0}")]
    AdapterContractViolation(#[from] ContractViolation),

    #[error("adapter failed")]
    Adapter(#[source] anyhow::Error),

    #[error("output sink rejected frame {frame}")]
    SinkRejection {
        frame: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl TrackError {
    /// Whether the failure only lost the current output frame.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TrackError::SinkRejection { .. })
    }
}

pub type TrackResult<T> = std::result::Result<T, TrackError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_messages() {
        let err: TrackError = ContractViolation::DegenerateFrame {
            expected: (640, 480),
            actual: (320, 240),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "adapter contract violation: frame shape (320, 240) differs from the previous \
             frame shape (640, 480)"
        );
        assert!(!err.is_recoverable());

        let err = TrackError::SinkRejection {
            frame: 3,
            source: anyhow!("disk full"),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "output sink rejected frame 3");
    }
}
