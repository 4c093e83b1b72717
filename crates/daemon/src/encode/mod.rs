//! Encoding modules for the timelapse daemon

pub mod ffmpeg;

pub use ffmpeg::{
    append_encode_log, build_encoder_command, encode_log_path, EncodeError, EncodeRequest,
    EncoderOutput, EncoderRunner, FfmpegRunner,
};
