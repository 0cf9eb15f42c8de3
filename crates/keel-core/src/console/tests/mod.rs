// Console test module
#[cfg(test)]
mod kernel_tests;
#[cfg(test)]
mod signature_tests;
