//! Fuzz target for the `stow.toml` parser.
//!
//! This target feeds arbitrary strings to the config parser, including
//! `${VAR}` references, to find crashes and panics.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_config_parser
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use stow_query::RepositoryConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // The parser should never panic, only return errors
        if let Ok(config) = RepositoryConfig::from_str(input) {
            let _ = config.with_environment("test");
        }
    }
});
