//! Build script for fakemem-core
//!
//! The reported capacity is fixed at build time. Configuration merging:
//! 1. Start with library defaults
//! 2. If FAKEMEM_CONFIG_RS env var is set, parse the user's config file
//! 3. Merge user values over defaults (user wins)
//! 4. Generate OUT_DIR/fakemem_merged_config.rs
//!
//! Example user file:
//!
//! ```text
//! // 64 GiB
//! pub const FAKE_BYTES: u64 = 64 * 1024 * 1024 * 1024;
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Configuration parameter definition
struct ConfigParam {
    name: &'static str,
    rust_type: &'static str,
    default_value: &'static str,
}

/// All configuration parameters with their defaults
const CONFIG_PARAMS: &[ConfigParam] = &[
    ConfigParam {
        name: "FAKE_BYTES",
        rust_type: "u64",
        default_value: "16 * 1024 * 1024 * 1024", // 16 GiB
    },
    ConfigParam {
        name: "DEFAULT_PAGE_SIZE",
        rust_type: "i64",
        default_value: "4096",
    },
    ConfigParam {
        name: "TEMP_PREFIX",
        rust_type: "&str",
        default_value: "\"fakemem_meminfo_\"",
    },
];

fn main() {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let dest_path = Path::new(&out_dir).join("fakemem_merged_config.rs");

    let mut config: HashMap<&str, String> = CONFIG_PARAMS
        .iter()
        .map(|p| (p.name, p.default_value.to_string()))
        .collect();

    if let Ok(user_path) = env::var("FAKEMEM_CONFIG_RS") {
        println!("cargo:rerun-if-changed={}", user_path);

        match fs::read_to_string(&user_path) {
            Ok(content) => {
                parse_and_merge(&content, &mut config);
                println!("cargo:warning=Using custom fakemem config: {}", user_path);
            }
            Err(e) => {
                println!(
                    "cargo:warning=Failed to read FAKEMEM_CONFIG_RS ({}): {}",
                    user_path, e
                );
            }
        }
    }

    println!("cargo:rerun-if-env-changed=FAKEMEM_CONFIG_RS");
    println!("cargo:rerun-if-changed=build.rs");

    let output = generate_config(&config);
    fs::write(&dest_path, output).expect("Failed to write merged config");
}

/// Parse user's config file and merge values into config map
fn parse_and_merge(content: &str, config: &mut HashMap<&str, String>) {
    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with("//") || !line.starts_with("pub const ") {
            continue;
        }

        let Some((name, value)) = parse_const_line(line) else {
            continue;
        };

        match CONFIG_PARAMS.iter().find(|p| p.name == name) {
            Some(param) => {
                config.insert(param.name, value);
            }
            None => println!("cargo:warning=Unknown fakemem config parameter: {}", name),
        }
    }
}

/// Parse `pub const NAME: TYPE = VALUE;` into (name, value)
fn parse_const_line(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix("pub const ")?.trim();

    let colon_pos = rest.find(':')?;
    let name = rest[..colon_pos].trim().to_string();

    let eq_pos = rest.find('=')?;
    let semi_pos = rest.rfind(';').unwrap_or(rest.len());
    if semi_pos <= eq_pos {
        return None;
    }

    let value = rest[eq_pos + 1..semi_pos].trim().to_string();
    if value.is_empty() {
        return None;
    }

    Some((name, value))
}

/// Generate the merged config Rust file
fn generate_config(config: &HashMap<&str, String>) -> String {
    let mut output = String::new();

    output.push_str("// Auto-generated by build.rs - do not edit\n");
    output.push_str("// Configuration merged from library defaults");
    if env::var("FAKEMEM_CONFIG_RS").is_ok() {
        output.push_str(" and FAKEMEM_CONFIG_RS");
    }
    output.push_str("\n\n");

    for param in CONFIG_PARAMS {
        let value = config
            .get(param.name)
            .map(String::as_str)
            .unwrap_or(param.default_value);
        output.push_str(&format!(
            "pub const {}: {} = {};\n",
            param.name, param.rust_type, value
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_const_line() {
        let result = parse_const_line("pub const FAKE_BYTES: u64 = 1 << 36;");
        assert_eq!(result, Some(("FAKE_BYTES".into(), "1 << 36".into())));

        let result = parse_const_line("pub const TEMP_PREFIX: &str = \"probe_\";");
        assert_eq!(result, Some(("TEMP_PREFIX".into(), "\"probe_\"".into())));

        assert_eq!(parse_const_line("pub const FAKE_BYTES: u64 = ;"), None);
    }

    #[test]
    fn test_parse_and_merge() {
        let mut config: HashMap<&str, String> = HashMap::new();
        config.insert("FAKE_BYTES", "16".into());

        let user_config = r#"
            // Custom config
            pub const FAKE_BYTES: u64 = 32 * 1024 * 1024 * 1024;
            pub const NOT_A_PARAM: u8 = 1;
        "#;

        parse_and_merge(user_config, &mut config);

        assert_eq!(
            config.get("FAKE_BYTES"),
            Some(&"32 * 1024 * 1024 * 1024".to_string())
        );
        assert!(!config.contains_key("NOT_A_PARAM"));
    }
}
