//! Compile-time defaults, merged by build.rs with the optional
//! `FAKEMEM_CONFIG_RS` user file.

include!(concat!(env!("OUT_DIR"), "/fakemem_merged_config.rs"));
