// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Logger setup

use log::{debug, LevelFilter};
use simplelog::{ConfigBuilder, SimpleLogger};

/// Initialise logging at the provided level
///
/// Subsequent calls are ignored, the first logger installed wins.
pub fn init(level: LevelFilter) {
    let log_cfg = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .add_filter_allow_str("keycard")
        .build();

    if SimpleLogger::init(level, log_cfg).is_ok() {
        debug!("Logging initialised ({level})");
    }
}
