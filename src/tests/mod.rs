pub(crate) mod test_utils;

mod adapter_test;
mod description_test;
