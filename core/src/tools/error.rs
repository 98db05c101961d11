use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_problem() {
        assert_eq!(ToolError::NotFound("x".into()).to_string(), "Tool not found: x");
        assert_eq!(
            ToolError::InvalidArguments("Text parameter is required".into()).to_string(),
            "Invalid arguments: Text parameter is required"
        );
    }
}
