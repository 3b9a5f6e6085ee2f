#[cfg(not(target_arch = "wasm32"))]
mod worker_tests;
