pub(crate) mod bank;
