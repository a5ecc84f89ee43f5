//! WAV encoding for rendered pieces.
//!
//! Writes 16-bit PCM stereo WAV blobs with the plain 44-byte header and
//! no metadata chunks, so identical samples always produce identical
//! bytes.

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::buffer::StereoBuffer;
use crate::gap::Gap;

/// MIME type of the encoded blob.
pub const WAV_MIME: &str = "audio/wav";

/// WAV format parameters.
#[derive(Debug, Clone, Copy)]
pub struct WavFormat {
    /// Number of channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bits per sample (always 16 here).
    pub bits_per_sample: u16,
}

impl WavFormat {
    /// Creates a stereo WAV format.
    pub fn stereo(sample_rate: u32) -> Self {
        Self {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
        }
    }

    /// Calculates bytes per sample (per channel).
    pub(crate) fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    /// Calculates block align (bytes per sample frame).
    pub(crate) fn block_align(&self) -> u16 {
        self.channels * self.bytes_per_sample()
    }

    /// Calculates byte rate (bytes per second).
    pub(crate) fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }
}

/// Converts one sample to a signed 16-bit value.
///
/// Scaling is asymmetric so the full signed range is used: -1.0 maps to
/// -32768 while +1.0 maps to 32767. Values outside [-1, 1] clip.
fn pcm16_value(sample: f64) -> i16 {
    let clipped = sample.clamp(-1.0, 1.0);
    if clipped < 0.0 {
        (clipped * 32768.0) as i16
    } else {
        (clipped * 32767.0) as i16
    }
}

/// Converts a stereo buffer to interleaved little-endian 16-bit PCM.
pub fn stereo_to_pcm16(buffer: &StereoBuffer) -> Vec<u8> {
    let frames = buffer.len();
    let mut pcm = Vec::with_capacity(frames * 4); // 2 channels * 2 bytes

    for i in 0..frames {
        pcm.extend_from_slice(&pcm16_value(buffer.left[i]).to_le_bytes());
        pcm.extend_from_slice(&pcm16_value(buffer.right[i]).to_le_bytes());
    }

    pcm
}

/// Writes a complete WAV file to a writer.
///
/// # Arguments
/// * `writer` - Output writer
/// * `format` - WAV format parameters
/// * `pcm_data` - Raw PCM samples as bytes
pub fn write_wav<W: Write>(writer: &mut W, format: &WavFormat, pcm_data: &[u8]) -> io::Result<()> {
    let data_size = pcm_data.len() as u32;

    // RIFF header
    writer.write_all(b"RIFF")?;
    writer.write_u32::<LittleEndian>(36 + data_size)?;
    writer.write_all(b"WAVE")?;

    // fmt chunk
    writer.write_all(b"fmt ")?;
    writer.write_u32::<LittleEndian>(16)?; // Chunk size (16 for PCM)
    writer.write_u16::<LittleEndian>(1)?; // Audio format (1 = PCM)
    writer.write_u16::<LittleEndian>(format.channels)?;
    writer.write_u32::<LittleEndian>(format.sample_rate)?;
    writer.write_u32::<LittleEndian>(format.byte_rate())?;
    writer.write_u16::<LittleEndian>(format.block_align())?;
    writer.write_u16::<LittleEndian>(format.bits_per_sample)?;

    // data chunk
    writer.write_all(b"data")?;
    writer.write_u32::<LittleEndian>(data_size)?;
    writer.write_all(pcm_data)?;

    Ok(())
}

/// Encodes a stereo buffer as a complete WAV blob.
pub fn encode_wav(buffer: &StereoBuffer, sample_rate: u32) -> Vec<u8> {
    let pcm = stereo_to_pcm16(buffer);
    let format = WavFormat::stereo(sample_rate);
    let mut wav = Vec::with_capacity(44 + pcm.len());
    write_wav(&mut wav, &format, &pcm).expect("writing to Vec should not fail");
    wav
}

/// Download filename for a gap's piece, derived from its endpoints.
pub fn wav_filename(gap: &Gap) -> String {
    format!("SongFromGap_{}_to_{}.wav", gap.from.title, gap.to.title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gap::GapEndpoint;

    fn frame_buffer(left: &[f64], right: &[f64]) -> StereoBuffer {
        StereoBuffer {
            left: left.to_vec(),
            right: right.to_vec(),
        }
    }

    #[test]
    fn test_wav_format_stereo() {
        let format = WavFormat::stereo(44100);
        assert_eq!(format.channels, 2);
        assert_eq!(format.bits_per_sample, 16);
        assert_eq!(format.block_align(), 4);
        assert_eq!(format.byte_rate(), 176400);
    }

    #[test]
    fn test_pcm16_uses_asymmetric_scaling() {
        assert_eq!(pcm16_value(0.0), 0);
        assert_eq!(pcm16_value(1.0), 32767);
        assert_eq!(pcm16_value(-1.0), -32768);
        assert_eq!(pcm16_value(0.5), 16383); // 0.5 * 32767 truncates
        assert_eq!(pcm16_value(-0.5), -16384);
    }

    #[test]
    fn test_pcm16_clips_out_of_range() {
        assert_eq!(pcm16_value(2.0), 32767);
        assert_eq!(pcm16_value(-2.0), -32768);
        assert_eq!(pcm16_value(f64::INFINITY), 32767);
        assert_eq!(pcm16_value(f64::NEG_INFINITY), -32768);
        assert_eq!(pcm16_value(f64::NAN), 0);
    }

    #[test]
    fn test_stereo_interleaving() {
        let buffer = frame_buffer(&[1.0, 0.0], &[-1.0, 0.5]);
        let pcm = stereo_to_pcm16(&buffer);

        assert_eq!(pcm.len(), 8);
        assert_eq!(i16::from_le_bytes([pcm[0], pcm[1]]), 32767); // L0
        assert_eq!(i16::from_le_bytes([pcm[2], pcm[3]]), -32768); // R0
        assert_eq!(i16::from_le_bytes([pcm[4], pcm[5]]), 0); // L1
        assert_eq!(i16::from_le_bytes([pcm[6], pcm[7]]), 16383); // R1
    }

    #[test]
    fn test_wav_header_fields() {
        let buffer = StereoBuffer::new(10);
        let wav = encode_wav(&buffer, 44100);

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");

        // Audio format (1 = PCM)
        assert_eq!(u16::from_le_bytes([wav[20], wav[21]]), 1);
        // Channels
        assert_eq!(u16::from_le_bytes([wav[22], wav[23]]), 2);
        // Sample rate
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 44100);
        // Byte rate
        assert_eq!(
            u32::from_le_bytes([wav[28], wav[29], wav[30], wav[31]]),
            176400
        );
        // Block align and bit depth
        assert_eq!(u16::from_le_bytes([wav[32], wav[33]]), 4);
        assert_eq!(u16::from_le_bytes([wav[34], wav[35]]), 16);
    }

    #[test]
    fn test_wav_length_formula() {
        let frames = 100;
        let wav = encode_wav(&StereoBuffer::new(frames), 44100);

        // 44-byte header plus frames * channels * 2 bytes
        assert_eq!(wav.len(), frames * 2 * 2 + 44);

        let file_size = u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]);
        assert_eq!(file_size, wav.len() as u32 - 8);

        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size, (frames * 4) as u32);
    }

    #[test]
    fn test_empty_buffer_is_header_only() {
        let wav = encode_wav(&StereoBuffer::new(0), 44100);
        assert_eq!(wav.len(), 44);
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 0);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let buffer = frame_buffer(&[0.5, -0.5, 0.3], &[-0.3, 0.25, 0.0]);
        assert_eq!(encode_wav(&buffer, 44100), encode_wav(&buffer, 44100));
    }

    #[test]
    fn test_wav_filename_uses_endpoint_titles() {
        let gap = Gap {
            id: "g".to_string(),
            semantic_similarity: 0.5,
            distance: 1.0,
            center: [0.0, 0.0],
            shared_links: Vec::new(),
            from: GapEndpoint {
                title: "alpha".to_string(),
            },
            to: GapEndpoint {
                title: "omega".to_string(),
            },
        };
        assert_eq!(wav_filename(&gap), "SongFromGap_alpha_to_omega.wav");
        assert_eq!(WAV_MIME, "audio/wav");
    }
}
