use crate::errors::ServiceError;

pub const DEFAULT_DISPLAY_ID_WIDTH: usize = 6;

/// Derives human-facing sequential identifiers such as `000042`.
///
/// The generator only knows how to step from the previous identifier; finding
/// that identifier (the most recently created record of a kind) and keeping
/// ids unique is the repository's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayIdGenerator {
    width: usize,
}

impl Default for DisplayIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_ID_WIDTH)
    }
}

impl DisplayIdGenerator {
    pub fn new(width: usize) -> Self {
        Self { width: width.max(1) }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn first(&self) -> String {
        self.format(1)
    }

    /// Identifier following `previous`, or the first one when there is none.
    pub fn next_after(&self, previous: Option<&str>) -> Result<String, ServiceError> {
        let Some(previous) = previous else {
            return Ok(self.first());
        };
        let current = parse_sequence(previous)?;
        let next = current.checked_add(1).ok_or_else(|| {
            ServiceError::MalformedIdentifier(format!(
                "display id {previous:?} cannot be incremented"
            ))
        })?;
        Ok(self.format(next))
    }

    /// Left-pads with zeros up to the configured width; wider numbers are kept whole.
    pub fn format(&self, sequence: u64) -> String {
        format!("{:0width$}", sequence, width = self.width)
    }
}

fn parse_sequence(display_id: &str) -> Result<u64, ServiceError> {
    if display_id.is_empty() || !display_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ServiceError::MalformedIdentifier(format!(
            "display id {display_id:?} is not a decimal number"
        )));
    }
    display_id.parse::<u64>().map_err(|_| {
        ServiceError::MalformedIdentifier(format!("display id {display_id:?} is out of range"))
    })
}
