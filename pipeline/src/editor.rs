use frame_filter_common::kernel::KernelError;
use tracing::{debug, info};

use crate::kernel::SharedKernel;

/// Turns raw text from the kernel's `n x n` input fields into kernel weights.
///
/// The editor mirrors the text of every field. Accepted input is written to the
/// shared kernel in a single swap; rejected input leaves the kernel untouched
/// and clears the offending field.
#[derive(Debug)]
pub struct KernelEditor {
    kernel: SharedKernel,
    size: usize,
    fields: Vec<String>,
}

impl KernelEditor {
    pub fn new(kernel: SharedKernel) -> Self {
        let snapshot = kernel.snapshot();
        let fields = snapshot.weights().iter().map(|w| w.to_string()).collect();
        Self {
            size: snapshot.size(),
            kernel,
            fields,
        }
    }

    pub fn kernel(&self) -> &SharedKernel {
        &self.kernel
    }

    /// Side length of the edited kernel.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Current text of the field at `(row, col)`.
    pub fn field(&self, row: usize, col: usize) -> Option<&str> {
        if row >= self.size || col >= self.size {
            return None;
        }
        Some(&self.fields[row * self.size + col])
    }

    /// Validate `text` and store it as the weight at `(row, col)`.
    ///
    /// Returns the stored weight. On [`EditorError::InvalidWeightInput`] the
    /// field is cleared and the kernel keeps its previous weight.
    pub fn set_weight(&mut self, row: usize, col: usize, text: &str) -> Result<f32, EditorError> {
        if row >= self.size || col >= self.size {
            return Err(KernelError::OutOfBounds {
                row,
                col,
                size: self.size,
            }
            .into());
        }
        let idx = row * self.size + col;

        let Some(value) = parse_weight(text) else {
            self.fields[idx].clear();
            debug!(row, col, input = text, "rejected kernel weight, field cleared");
            return Err(EditorError::InvalidWeightInput {
                row,
                col,
                input: text.to_string(),
            });
        };

        self.kernel.update(|k| k.set_weight(row, col, value))?;
        self.fields[idx] = text.trim().to_string();
        info!(row, col, value, "kernel weight updated");
        Ok(value)
    }
}

/// Parse a signed decimal number: optional sign, digits, at most one `.`.
///
/// Exponents, `inf`/`nan`, and empty input are rejected even though `f32`'s
/// own parser would accept some of them, as are decimals too large for `f32`.
pub fn parse_weight(text: &str) -> Option<f32> {
    let text = text.trim();
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);

    let mut seen_digit = false;
    let mut seen_dot = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return None,
        }
    }
    if !seen_digit {
        return None;
    }
    text.parse::<f32>().ok().filter(|value| value.is_finite())
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("invalid weight {input:?} for cell ({row}, {col}): expected a decimal number")]
    InvalidWeightInput {
        row: usize,
        col: usize,
        input: String,
    },
    #[error(transparent)]
    Kernel(#[from] KernelError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_filter_common::kernel::Kernel;

    fn editor() -> KernelEditor {
        KernelEditor::new(SharedKernel::new(Kernel::filled(3, 1.0).unwrap()))
    }

    #[test]
    fn accepts_signed_decimals() {
        let mut editor = editor();
        assert_eq!(editor.set_weight(0, 0, "-1.5").unwrap(), -1.5);
        assert_eq!(editor.kernel().snapshot().weight(0, 0), Ok(-1.5));
        assert_eq!(editor.field(0, 0), Some("-1.5"));

        assert_eq!(editor.set_weight(2, 2, " +4 ").unwrap(), 4.0);
        assert_eq!(editor.field(2, 2), Some("+4"));
        assert_eq!(editor.set_weight(1, 2, ".25").unwrap(), 0.25);
        assert_eq!(editor.set_weight(1, 0, "7.").unwrap(), 7.0);
    }

    #[test]
    fn rejects_non_numeric_and_keeps_kernel() {
        let mut editor = editor();
        editor.set_weight(0, 0, "2").unwrap();
        let before = editor.kernel().snapshot();

        let err = editor.set_weight(0, 0, "abc").unwrap_err();
        assert!(matches!(
            err,
            EditorError::InvalidWeightInput { row: 0, col: 0, ref input } if input == "abc"
        ));
        assert_eq!(editor.field(0, 0), Some(""), "rejected field must be cleared");
        assert_eq!(*editor.kernel().snapshot(), *before);
        assert_eq!(editor.kernel().snapshot().weight(0, 0), Ok(2.0));
    }

    #[test]
    fn rejects_everything_but_plain_decimals() {
        for input in ["", " ", "-", "+", ".", "1.2.3", "1e3", "inf", "NaN", "--1", "1-", "0x10", "1,5"] {
            assert_eq!(parse_weight(input), None, "{input:?} should be rejected");
        }
        let huge = format!("1{}", "0".repeat(40));
        assert_eq!(parse_weight(&huge), None, "overflowing decimal must not become inf");
        assert_eq!(parse_weight(&format!("-{huge}.5")), None);
        assert_eq!(parse_weight("0"), Some(0.0));
        assert_eq!(parse_weight("-0.5"), Some(-0.5));
        assert_eq!(parse_weight("12"), Some(12.0));
    }

    #[test]
    fn overflowing_input_is_rejected_and_cleared() {
        let mut editor = editor();
        let huge = format!("1{}", "0".repeat(40));
        assert!(matches!(
            editor.set_weight(0, 0, &huge),
            Err(EditorError::InvalidWeightInput { row: 0, col: 0, .. })
        ));
        assert_eq!(editor.field(0, 0), Some(""));
        assert_eq!(editor.kernel().snapshot().weight(0, 0), Ok(1.0));
        assert!(editor.kernel().snapshot().weights().iter().all(|w| w.is_finite()));
    }

    #[test]
    fn out_of_bounds_cell_is_an_error() {
        let mut editor = editor();
        assert!(matches!(
            editor.set_weight(3, 0, "1"),
            Err(EditorError::Kernel(KernelError::OutOfBounds { .. }))
        ));
        assert_eq!(editor.field(3, 0), None);
    }

    #[test]
    fn fields_start_from_kernel_weights() {
        let mut kernel = Kernel::filled(3, 0.0).unwrap();
        kernel.set_weight(1, 1, 1.5).unwrap();
        let editor = KernelEditor::new(SharedKernel::new(kernel));
        assert_eq!(editor.size(), 3);
        assert_eq!(editor.field(0, 0), Some("0"));
        assert_eq!(editor.field(1, 1), Some("1.5"));
    }
}
