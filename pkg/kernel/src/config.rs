//! Kernel command line options.
//!
//! The loader's command line is a list of whitespace separated `key=value`
//! pairs. Unknown keys and unparsable values are reported and ignored.

use log::LevelFilter;

/// File echoed to the console after mount unless `open=` names another.
pub const DEFAULT_OPEN_FILE: &str = "HELLO.TXT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig<'a> {
    /// `log=<off|error|warn|info|debug|trace>`
    pub log_level: LevelFilter,
    /// `open=<8.3 name>`
    pub open: &'a str,
    /// `paging=<on|off>`: load CR3 with the prepared page directory.
    pub load_paging: bool,
    /// `mount=<on|off>`: mount the FAT volume on the primary master.
    pub mount: bool,
}

impl Default for KernelConfig<'_> {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::Info,
            open: DEFAULT_OPEN_FILE,
            load_paging: false,
            mount: true,
        }
    }
}

impl<'a> KernelConfig<'a> {
    pub fn parse(cmdline: &'a str) -> Self {
        let mut config = Self::default();

        for option in cmdline.split_whitespace() {
            let Some((key, value)) = option.split_once('=') else {
                warn!("Ignoring option without a value: {}", option);
                continue;
            };

            match key {
                "log" => match value.parse::<LevelFilter>() {
                    Ok(level) => config.log_level = level,
                    Err(_) => warn!("Unknown log level: {}", value),
                },
                "open" if !value.is_empty() => config.open = value,
                "paging" => parse_switch(key, value, &mut config.load_paging),
                "mount" => parse_switch(key, value, &mut config.mount),
                _ => warn!("Unknown option: {}", option),
            }
        }

        config
    }
}

fn parse_switch(key: &str, value: &str, target: &mut bool) {
    match value {
        "on" | "1" | "true" => *target = true,
        "off" | "0" | "false" => *target = false,
        _ => warn!("Expected on/off for {}, got {}", key, value),
    }
}
