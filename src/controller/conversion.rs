use super::ThreadController;
use crate::error::Result;
use crate::protocol::ConversionDirection;

/// Translate Jac source to Python through the controller's worker.
pub fn convert_jac_to_python(controller: &mut ThreadController, source: &str) -> Result<String> {
    controller.convert(ConversionDirection::JacToPython, source)
}

/// Translate Python source to Jac through the controller's worker.
pub fn convert_python_to_jac(controller: &mut ThreadController, source: &str) -> Result<String> {
    controller.convert(ConversionDirection::PythonToJac, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PlaygroundConfig, PlaygroundError, ScriptRuntime};

    #[test]
    fn blank_source_is_rejected_before_the_worker_is_asked() {
        let mut controller =
            ThreadController::new(PlaygroundConfig::default(), Box::new(ScriptRuntime::default()));
        let err = convert_python_to_jac(&mut controller, "  \n\t").unwrap_err();
        assert!(matches!(
            err,
            PlaygroundError::EmptySource {
                direction: ConversionDirection::PythonToJac
            }
        ));
        assert_eq!(err.to_string(), "no Python code provided");
    }

    #[test]
    fn conversion_needs_a_loaded_runtime() {
        let mut controller =
            ThreadController::new(PlaygroundConfig::default(), Box::new(ScriptRuntime::default()));
        let err = convert_jac_to_python(&mut controller, "with entry { print(1); }").unwrap_err();
        assert!(matches!(err, PlaygroundError::NotInitialized));
    }
}
