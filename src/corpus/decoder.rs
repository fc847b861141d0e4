use std::{fs::File, io, path::Path};

use symphonia::core::{
    audio::{SampleBuffer, SignalSpec},
    codecs::{CodecParameters, Decoder, DecoderOptions},
    errors::Error as SymphoniaError,
    formats::{FormatOptions, FormatReader},
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use crate::error::Error;

// -------------------------------------------------------------------------------------------------

/// Decodes audio files into memory, keeping only the first channel of multi channel files.
pub(crate) struct AudioDecoder {
    track_id: u32,
    decoder: Box<dyn Decoder>,
    format: Box<dyn FormatReader>,
}

impl AudioDecoder {
    /// Create a new decoder from the given file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path.as_ref()).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                Error::MediaFileNotFound
            } else {
                Error::IoError(err)
            }
        })?;
        let source_stream = MediaSourceStream::new(Box::new(file), Default::default());
        Self::from_source_stream(source_stream)
    }

    /// Create a new decoder from the given Symphonia MediaSourceStream
    pub fn from_source_stream(source_stream: MediaSourceStream) -> Result<Self, Error> {
        let hint = Hint::new();
        let format_opts: FormatOptions = Default::default();
        let metadata_opts: MetadataOptions = Default::default();
        let decoder_opts: DecoderOptions = Default::default();

        let probed = symphonia::default::get_probe()
            .format(&hint, source_stream, &format_opts, &metadata_opts)
            .map_err(|_| Error::MediaFileProbeError)?;
        let format = probed.format;

        let track = match format.default_track() {
            Some(t) => t,
            None => {
                return Err(Error::MediaFileNotFound);
            }
        };
        let track_id = track.id;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &decoder_opts)
            .map_err(|err| Error::AudioDecodingError(Box::new(err)))?;

        Ok(Self {
            track_id,
            decoder,
            format,
        })
    }

    pub fn codec_params(&self) -> &CodecParameters {
        self.decoder.codec_params()
    }

    pub fn signal_spec(&self) -> Result<SignalSpec, Error> {
        match (self.codec_params().sample_rate, self.codec_params().channels) {
            (Some(rate), Some(channels)) => Ok(SignalSpec { rate, channels }),
            _ => Err(Error::MediaFileProbeError),
        }
    }

    /// Decode the whole file and return its first channel as mono sample buffer.
    pub fn decode_first_channel(mut self) -> Result<(Vec<f32>, u32), Error> {
        let spec = self.signal_spec()?;
        let channel_count = spec.channels.count().max(1);

        let frames_hint = self.codec_params().n_frames.unwrap_or(0) as usize;
        let mut samples = Vec::with_capacity(frames_hint);

        let decode_buffer_capacity = self
            .codec_params()
            .max_frames_per_packet
            .unwrap_or(16 * 1024 * channel_count as u64);
        let mut decode_buffer = SampleBuffer::<f32>::new(decode_buffer_capacity, spec);

        while self.read_packet(&mut decode_buffer) {
            samples.extend(decode_buffer.samples().iter().step_by(channel_count));
        }
        if samples.is_empty() {
            return Err(Error::AudioDecodingError(Box::new(
                SymphoniaError::DecodeError("file contains no audio"),
            )));
        }
        Ok((samples, spec.rate))
    }

    /// Read the next packet into the given sample buffer. Returns false on EOF or on
    /// unrecoverable errors.
    fn read_packet(&mut self, samples: &mut SampleBuffer<f32>) -> bool {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(io)) if io.kind() == io::ErrorKind::UnexpectedEof => {
                    return false;
                }
                Err(err) => {
                    log::error!("format error: {err}");
                    return false;
                }
            };
            if packet.track_id() != self.track_id {
                continue;
            }
            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    samples.copy_interleaved_ref(decoded);
                    return true;
                }
                Err(SymphoniaError::IoError(err)) => {
                    log::error!("io decode error: {err}");
                    continue;
                }
                Err(SymphoniaError::DecodeError(err)) => {
                    log::error!("decode error: {err}");
                    continue;
                }
                Err(err) => {
                    log::error!("fatal decode error: {err}");
                    return false;
                }
            };
        }
    }
}
