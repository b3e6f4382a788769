use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("page_requests_total", "Total number of page requests")
            .expect("register page_requests_total");
    pub static ref CACHE_HITS: Counter =
        register_counter!("page_cache_hits_total", "Total cache hits")
            .expect("register page_cache_hits_total");
    pub static ref CACHE_MISSES: Counter =
        register_counter!("page_cache_misses_total", "Total cache misses")
            .expect("register page_cache_misses_total");
    pub static ref GENERATION_FAILURES: Counter = register_counter!(
        "page_generation_failures_total",
        "Upstream generations that failed"
    )
    .expect("register page_generation_failures_total");
    pub static ref CACHE_WRITE_ERRORS: Counter = register_counter!(
        "page_cache_write_errors_total",
        "Generated pages that could not be stored"
    )
    .expect("register page_cache_write_errors_total");
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "page_request_latency_seconds",
        "Request latency in seconds"
    )
    .expect("register page_request_latency_seconds");
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("page_cache_size", "Current number of pages in cache")
            .expect("register page_cache_size");
}
