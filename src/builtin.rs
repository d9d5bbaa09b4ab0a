/// In-process broker, records batches (tests, demos, dry runs)
pub mod memory;



#[cfg(feature = "kafka")]
pub mod kafka;



#[cfg(feature = "pulsar")]
pub mod pulsar;
