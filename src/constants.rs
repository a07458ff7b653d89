pub const TIMEOUT_MSG: &str = "Execution timed out";
pub const CORRUPTED_OUTPUT_MSG: &str = "Program output is corrupted: read past the end of the input stream";
pub const COMPILER_FAULT_MSG: &str = "Failed to run the compiler";

pub const CHECKER_SIGNATURE: &str = "fn checker(expected, actual)";
pub const CHECKER_SIGNATURE_MSG: &str =
    "Checker must start with the signature `fn checker(expected, actual)`";
pub const CHECKER_RETURN_MSG: &str = "Checker has no return statement";
pub const CHECKER_NON_BOOL_MSG: &str = "Checker must return a boolean value";
pub const CHECKER_RUNTIME_MSG: &str = "Checker failed during evaluation";

pub const COMPILER_SUCCESS_MARKER: &str = "OK\n";
