mod business_logic;
mod merge;
mod test_script;
mod text;

pub use business_logic::parse_business_logic;
pub use merge::merge_business_logic;
pub use test_script::parse_test_script;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("the model returned an empty response")]
    EmptyResponse,

    #[error("no recognizable sections found; expected headings such as {expected}")]
    NoRecognizedSections { expected: String },

    #[error("no test cases found; expected blocks starting with 'Test Case: <ID>'")]
    NoTestCases,
}
