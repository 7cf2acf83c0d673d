pub mod frame_producer;
pub mod handoff;
pub mod wav_format;
