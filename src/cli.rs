//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

use crate::audio::AudioInput;
use crate::error::ConfigError;
use crate::params::Config;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "wavetrail")]
#[command(about = "Scrolling 3D spectrum trace of live audio", long_about = None)]
pub struct Args {
    /// TOML configuration file (every field optional)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// WAV file to loop; click the window to start/pause playback
    #[arg(long, value_name = "WAV", conflicts_with = "mic")]
    pub input: Option<PathBuf>,

    /// Analyse the default microphone instead of a file
    #[arg(long)]
    pub mic: bool,

    /// FFT window size (power of 2); the trace uses half as many bins
    #[arg(long, value_name = "SAMPLES")]
    pub fft_size: Option<usize>,

    /// Minimum time between trace ticks
    #[arg(long, value_name = "MS")]
    pub tick_interval_ms: Option<u64>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Load the config file (if any), apply flag overrides and validate
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(fft_size) = self.fft_size {
            config.spectrum.fft_size = fft_size;
        }
        if let Some(ms) = self.tick_interval_ms {
            config.schedule.min_tick_interval_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }

    /// Requested audio input; `None` runs the trace on silence
    pub fn audio_input(&self) -> Option<AudioInput> {
        if self.mic {
            Some(AudioInput::Microphone)
        } else {
            self.input.clone().map(AudioInput::File)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("wavetrail").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.log_level, "info");
        assert_eq!(args.audio_input(), None);
        assert_eq!(args.load_config().unwrap(), Config::default());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[spectrum]\nfft_size = 256\n\n[schedule]\nmin_tick_interval_ms = 20").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = parse(&["--config", &path, "--tick-interval-ms", "10"])
            .load_config()
            .unwrap();
        assert_eq!(config.spectrum.fft_size, 256);
        assert_eq!(config.schedule.min_tick_interval_ms, 10);
    }

    #[test]
    fn test_invalid_fft_size_is_rejected() {
        let err = parse(&["--fft-size", "100"]).load_config().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_audio_input_selection() {
        assert_eq!(
            parse(&["--input", "clip.wav"]).audio_input(),
            Some(AudioInput::File(PathBuf::from("clip.wav")))
        );
        assert_eq!(parse(&["--mic"]).audio_input(), Some(AudioInput::Microphone));
        assert!(Args::try_parse_from(["wavetrail", "--mic", "--input", "a.wav"]).is_err());
    }
}
