//! In-memory corpus of analysed audio files.

use std::path::Path;

use crate::error::Error;

mod decoder;
use decoder::AudioDecoder;

// -------------------------------------------------------------------------------------------------

/// A single point in the corpus: an analysis timepoint within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CorpusPoint {
    pub file: usize,
    pub timepoint: usize,
}

impl CorpusPoint {
    pub fn new(file: usize, timepoint: usize) -> Self {
        Self { file, timepoint }
    }

    /// Sample offset of this timepoint in its file's audio buffer.
    #[inline]
    pub fn sample_index(&self, hop_size: usize) -> usize {
        self.timepoint * hop_size
    }
}

// -------------------------------------------------------------------------------------------------

/// A file in the corpus: its mono audio (when loaded) and its per timepoint feature vectors.
#[derive(Debug, Clone)]
struct CorpusFile {
    name: String,
    samples: Option<Vec<f32>>,
    features: Vec<Vec<f64>>, // [timepoint][dimension]
}

// -------------------------------------------------------------------------------------------------

/// An immutable collection of analysed audio files.
///
/// All audio is fully resident in memory as mono `f32` buffers. Each file has a sequence of
/// analysis timepoints, spaced by the corpus' hop size, with one feature vector per timepoint.
/// Files can be registered without audio ("not loaded"): they still take part in the feature
/// space, but playheads can never play or jump to them.
///
/// A corpus gets built once, then shared read-only with the playback engine via an `Arc`.
#[derive(Debug, Clone)]
pub struct Corpus {
    hop_size: usize,
    dimension_names: Vec<String>,
    files: Vec<CorpusFile>,
}

impl Corpus {
    /// Create a new empty corpus with the given analysis hop size and feature dimensions.
    pub fn new(hop_size: usize, dimension_names: Vec<String>) -> Result<Self, Error> {
        if hop_size == 0 {
            return Err(Error::CorpusError("hop size must be > 0".to_string()));
        }
        if dimension_names.is_empty() {
            return Err(Error::CorpusError(
                "corpus needs at least one feature dimension".to_string(),
            ));
        }
        Ok(Self {
            hop_size,
            dimension_names,
            files: Vec::new(),
        })
    }

    /// Add a file with the given mono audio samples and feature vectors.
    /// Returns the new file's index.
    pub fn add_file(
        &mut self,
        name: &str,
        samples: Vec<f32>,
        features: Vec<Vec<f64>>,
    ) -> Result<usize, Error> {
        self.validate_features(name, &features)?;
        self.files.push(CorpusFile {
            name: name.to_string(),
            samples: Some(samples),
            features,
        });
        Ok(self.files.len() - 1)
    }

    /// Add a file which only has feature vectors but no audio in memory.
    pub fn add_unloaded_file(
        &mut self,
        name: &str,
        features: Vec<Vec<f64>>,
    ) -> Result<usize, Error> {
        self.validate_features(name, &features)?;
        self.files.push(CorpusFile {
            name: name.to_string(),
            samples: None,
            features,
        });
        Ok(self.files.len() - 1)
    }

    /// Decode the given audio file and add its first channel with the given feature vectors.
    ///
    /// Audio is not resampled: the file is expected to match the output stream's rate.
    pub fn add_audio_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        features: Vec<Vec<f64>>,
    ) -> Result<usize, Error> {
        let path = path.as_ref();
        let name = path.to_string_lossy().to_string();
        self.validate_features(&name, &features)?;
        let (samples, sample_rate) = AudioDecoder::from_file(path)?.decode_first_channel()?;
        log::debug!(
            "decoded corpus file '{}': {} samples at {} Hz",
            name,
            samples.len(),
            sample_rate
        );
        self.add_file(&name, samples, features)
    }

    fn validate_features(&self, name: &str, features: &[Vec<f64>]) -> Result<(), Error> {
        let dimension_count = self.dimension_count();
        if let Some(timepoint) = features.iter().position(|v| v.len() != dimension_count) {
            return Err(Error::CorpusError(format!(
                "feature vector of file '{}' at timepoint {} has {} dimensions, expected {}",
                name,
                timepoint,
                features[timepoint].len(),
                dimension_count
            )));
        }
        Ok(())
    }

    /// Analysis hop size in samples: the distance between two timepoints.
    #[inline]
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn dimension_names(&self) -> &[String] {
        &self.dimension_names
    }

    #[inline]
    pub fn dimension_count(&self) -> usize {
        self.dimension_names.len()
    }

    #[inline]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_name(&self, file: usize) -> Option<&str> {
        self.files.get(file).map(|f| f.name.as_str())
    }

    /// true when the file exists and its audio is resident in memory.
    #[inline]
    pub fn is_loaded(&self, file: usize) -> bool {
        self.files.get(file).is_some_and(|f| f.samples.is_some())
    }

    /// The file's mono audio samples. Empty for unknown or unloaded files.
    #[inline]
    pub fn samples(&self, file: usize) -> &[f32] {
        self.files
            .get(file)
            .and_then(|f| f.samples.as_deref())
            .unwrap_or(&[])
    }

    /// Number of audio samples of the given file. 0 for unknown or unloaded files.
    #[inline]
    pub fn sample_count(&self, file: usize) -> usize {
        self.samples(file).len()
    }

    /// Number of analysis timepoints of the given file.
    #[inline]
    pub fn timepoint_count(&self, file: usize) -> usize {
        self.files.get(file).map_or(0, |f| f.features.len())
    }

    /// Number of timepoints in all files.
    pub fn total_timepoint_count(&self) -> usize {
        self.files.iter().map(|f| f.features.len()).sum()
    }

    /// Feature value of the given point and dimension, if it exists.
    #[inline]
    pub fn feature(&self, point: CorpusPoint, dimension: usize) -> Option<f64> {
        self.files
            .get(point.file)?
            .features
            .get(point.timepoint)?
            .get(dimension)
            .copied()
    }

    /// Feature value at the timepoint which contains the given sample offset. Offsets past
    /// the last analysed timepoint use the last timepoint.
    #[inline]
    pub fn feature_at_sample(&self, file: usize, sample_index: usize, dimension: usize) -> Option<f64> {
        let timepoint_count = self.timepoint_count(file);
        if timepoint_count == 0 {
            return None;
        }
        let timepoint = (sample_index / self.hop_size).min(timepoint_count - 1);
        self.feature(CorpusPoint::new(file, timepoint), dimension)
    }

    /// All feature vectors of the given file.
    pub fn features(&self, file: usize) -> &[Vec<f64>] {
        match self.files.get(file) {
            Some(f) => &f.features,
            None => &[],
        }
    }

    /// Upper bound of the number of trigger points any playhead in this corpus will need.
    pub fn max_trigger_point_count(&self) -> usize {
        self.files
            .iter()
            .map(|f| f.samples.as_ref().map_or(0, |s| s.len()) / self.hop_size + 2)
            .max()
            .unwrap_or(0)
    }
}

// -------------------------------------------------------------------------------------------------
