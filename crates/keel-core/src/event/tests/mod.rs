#[cfg(test)]
mod types_tests;
