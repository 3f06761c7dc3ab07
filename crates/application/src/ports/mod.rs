mod counter_sink;
mod dns_resolver;
mod log_sink;

pub use counter_sink::{CounterSink, StatisticsSnapshot};
pub use dns_resolver::DnsResolver;
pub use log_sink::{LogLevel, LogSink, NullLogSink};
