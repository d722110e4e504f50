//! Pull-based sample-rate conversion for pitched playback.
//!
//! The converter works in fixed output chunks of [`CHUNK_LEN`] frames and pulls
//! whatever amount of source it asks for next from the caller's buffer, starting
//! at a cursor. Output left over from the last chunk is kept and handed out first
//! on the next call, until [`Resampler::last`] drops it before a discontinuity.
//!
//! All scratch memory is allocated at construction; `process` never allocates.

use crate::buffer::AudioBuffer;
use crate::error::{Error, Result};
use crate::Frame;
use rubato::{
    FastFixedOut, PolynomialDegree, Resampler as _, SincFixedOut, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Output frames produced per converter call.
pub const CHUNK_LEN: usize = 256;

/// Widest ratio swing around unity, covering the full pitch range.
const MAX_RATIO_RELATIVE: f64 = 10.0;

/// Conversion quality, serialized as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ResamplerQuality {
    SincBest = 0,
    SincMedium = 1,
    SincFastest = 2,
    ZeroOrderHold = 3,
    #[default]
    Linear = 4,
}

impl From<ResamplerQuality> for u8 {
    fn from(quality: ResamplerQuality) -> Self {
        quality as u8
    }
}

impl TryFrom<u8> for ResamplerQuality {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(ResamplerQuality::SincBest),
            1 => Ok(ResamplerQuality::SincMedium),
            2 => Ok(ResamplerQuality::SincFastest),
            3 => Ok(ResamplerQuality::ZeroOrderHold),
            4 => Ok(ResamplerQuality::Linear),
            other => Err(Error::UnknownQuality(other)),
        }
    }
}

impl ResamplerQuality {
    fn sinc_parameters(self) -> Option<SincInterpolationParameters> {
        let (sinc_len, oversampling_factor, interpolation, window) = match self {
            ResamplerQuality::SincBest => (
                256,
                256,
                SincInterpolationType::Cubic,
                WindowFunction::BlackmanHarris2,
            ),
            ResamplerQuality::SincMedium => (
                128,
                128,
                SincInterpolationType::Linear,
                WindowFunction::Blackman2,
            ),
            ResamplerQuality::SincFastest => (
                64,
                64,
                SincInterpolationType::Nearest,
                WindowFunction::Hann2,
            ),
            ResamplerQuality::ZeroOrderHold | ResamplerQuality::Linear => return None,
        };
        Some(SincInterpolationParameters {
            sinc_len,
            f_cutoff: 0.95,
            interpolation,
            oversampling_factor,
            window,
        })
    }
}

/// Frames read from the source and written to the destination by one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Conversion {
    pub used: Frame,
    pub generated: Frame,
}

enum Converter {
    Sinc(SincFixedOut<f32>),
    Fast(FastFixedOut<f32>),
}

macro_rules! with_converter {
    ($converter:expr, $inner:ident => $body:expr) => {
        match $converter {
            Converter::Sinc($inner) => $body,
            Converter::Fast($inner) => $body,
        }
    };
}

pub struct Resampler {
    converter: Converter,
    quality: ResamplerQuality,
    channels: usize,
    ratio: f64,
    input: Vec<Vec<f32>>,
    output: Vec<Vec<f32>>,
    pending_pos: usize,
    pending_len: usize,
}

impl std::fmt::Debug for Resampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resampler")
            .field("quality", &self.quality)
            .field("channels", &self.channels)
            .field("ratio", &self.ratio)
            .field("pending", &self.pending_len)
            .finish()
    }
}

impl Resampler {
    /// Builds a converter for interleaved `channels`-wide material. Failure here
    /// is fatal to the owner.
    pub fn new(quality: ResamplerQuality, channels: usize) -> Result<Self> {
        if channels == 0 {
            return Err(Error::InvalidChannels(channels));
        }

        let converter = match quality.sinc_parameters() {
            Some(params) => Converter::Sinc(SincFixedOut::<f32>::new(
                1.0,
                MAX_RATIO_RELATIVE,
                params,
                CHUNK_LEN,
                channels,
            )?),
            None => {
                let degree = if quality == ResamplerQuality::ZeroOrderHold {
                    PolynomialDegree::Nearest
                } else {
                    PolynomialDegree::Linear
                };
                Converter::Fast(FastFixedOut::<f32>::new(
                    1.0,
                    MAX_RATIO_RELATIVE,
                    degree,
                    CHUNK_LEN,
                    channels,
                )?)
            }
        };

        let (input_max, output_max) = with_converter!(&converter, c => {
            (c.input_frames_max(), c.output_frames_max())
        });

        Ok(Self {
            converter,
            quality,
            channels,
            ratio: 1.0,
            input: vec![Vec::with_capacity(input_max); channels],
            output: vec![vec![0.0; output_max]; channels],
            pending_pos: 0,
            pending_len: 0,
        })
    }

    pub fn quality(&self) -> ResamplerQuality {
        self.quality
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Converted frames already computed but not yet handed out.
    pub fn pending(&self) -> Frame {
        self.pending_len
    }

    /// Converts source read from `input` at `input_pos` into `output` from
    /// `output_pos` to its end, at `ratio` = output rate / input rate. Stops
    /// early when the source runs out.
    pub fn process<I, O>(
        &mut self,
        input: &AudioBuffer<I>,
        input_pos: Frame,
        output: &mut AudioBuffer<O>,
        output_pos: Frame,
        ratio: f64,
    ) -> Result<Conversion>
    where
        I: AsRef<[f32]>,
        O: AsRef<[f32]> + AsMut<[f32]>,
    {
        debug_assert_eq!(input.channels(), self.channels, "input channel mismatch");
        debug_assert!(output.channels() >= self.channels, "output too narrow");

        if (ratio - self.ratio).abs() > f64::EPSILON {
            with_converter!(&mut self.converter, c => c.set_resample_ratio(ratio, false))?;
            self.ratio = ratio;
        }

        let wanted = output.frames().saturating_sub(output_pos);
        let mut result = Conversion::default();

        while result.generated < wanted {
            if self.pending_len > 0 {
                let count = self.pending_len.min(wanted - result.generated);
                for i in 0..count {
                    let frame = output.frame_mut(output_pos + result.generated + i);
                    for (ch, buf) in self.output.iter().enumerate() {
                        frame[ch] = buf[self.pending_pos + i];
                    }
                }
                self.pending_pos += count;
                self.pending_len -= count;
                result.generated += count;
                continue;
            }

            let cursor = input_pos + result.used;
            let pulled = self.pull(input, cursor);
            if pulled == 0 {
                break;
            }
            result.used += pulled;

            let written = self.convert()?;
            if written == 0 {
                break;
            }
            self.pending_pos = 0;
            self.pending_len = written;
        }

        Ok(result)
    }

    /// Resets the converter before an expected discontinuity, e.g. a loop wrap.
    pub fn last(&mut self) {
        with_converter!(&mut self.converter, c => c.reset());
        self.pending_pos = 0;
        self.pending_len = 0;
    }

    /// Copies the next chunk the converter asks for out of `input`, from
    /// `cursor`. Returns how many source frames were available.
    fn pull<I: AsRef<[f32]>>(&mut self, input: &AudioBuffer<I>, cursor: Frame) -> Frame {
        let needed = with_converter!(&self.converter, c => c.input_frames_next());
        let available = input.frames().saturating_sub(cursor);
        let frames = needed.min(available);

        for (ch, buf) in self.input.iter_mut().enumerate() {
            buf.clear();
            buf.extend((0..frames).map(|f| input.sample(cursor + f, ch)));
        }
        frames
    }

    fn convert(&mut self) -> Result<usize> {
        let needed = with_converter!(&self.converter, c => c.input_frames_next());
        let waves: SmallVec<[&[f32]; 2]> = self.input.iter().map(|b| b.as_slice()).collect();
        let output = &mut self.output;

        let (_, written) = if waves.first().map_or(0, |w| w.len()) < needed {
            with_converter!(&mut self.converter, c => {
                c.process_partial_into_buffer(Some(&waves[..]), output, None)
            })?
        } else {
            with_converter!(&mut self.converter, c => {
                c.process_into_buffer(&waves[..], output, None)
            })?
        };
        Ok(written)
    }
}
