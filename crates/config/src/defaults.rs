pub fn default_enabled() -> bool {
    true
}

pub fn default_workers() -> usize {
    4
}

pub fn default_merge_threshold() -> usize {
    1024
}

pub fn default_on_invalid() -> String {
    "skip".to_string()
}

pub fn default_order_count() -> usize {
    1000
}

pub fn default_symbols() -> Vec<String> {
    vec!["TSM".to_string()]
}

pub fn default_price_min() -> f64 {
    100.0
}

pub fn default_price_max() -> f64 {
    200.0
}

pub fn default_max_quantity() -> u64 {
    10
}

pub fn default_seed() -> u64 {
    42
}

pub fn default_output_format() -> String {
    "text".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}

pub fn default_metrics_port() -> u16 {
    9090
}
