pub mod kafka_producer;
