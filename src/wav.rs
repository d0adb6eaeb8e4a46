//! Minimal WAV file reader for the playback demonstration.
//!
//! Reads RIFF/WAVE containers holding uncompressed 16-bit PCM, which is
//! all the player needs. Unknown chunks (`LIST`, `cue `, and friends) are
//! skipped while walking to the `data` chunk.

// WAV file format constants
// See: http://soundfile.sapp.org/doc/WaveFormat/

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::PlaybackError;

/// RIFF container magic.
const RIFF_MAGIC: &[u8; 4] = b"RIFF";

/// WAVE form type inside the RIFF container.
const WAVE_MAGIC: &[u8; 4] = b"WAVE";

/// Identifier of the format chunk.
const FMT_CHUNK_ID: &[u8; 4] = b"fmt ";

/// Identifier of the sample data chunk.
const DATA_CHUNK_ID: &[u8; 4] = b"data";

/// Size of the fmt chunk data we parse (16 bytes for PCM).
const WAV_FMT_CHUNK_SIZE: u32 = 16;

/// Audio format code for PCM (uncompressed).
const WAV_FORMAT_PCM: u16 = 1;

/// Bits per sample for 16-bit audio.
const WAV_BITS_PER_SAMPLE: u16 = 16;

/// Bytes per sample (16-bit = 2 bytes).
const BYTES_PER_SAMPLE: u64 = 2;

/// A streaming reader over the `data` chunk of a PCM-16 WAV file.
///
/// Construction parses and validates the header; afterwards
/// [`read_block`](Self::read_block) hands out samples in caller-sized
/// blocks until the data chunk is exhausted.
#[derive(Debug)]
pub struct WavReader<R> {
    reader: R,
    sample_rate: u32,
    channels: u16,
    /// Bytes of sample data not yet read.
    data_remaining: u64,
    /// Reused byte buffer for `read_block`; grows once, then steady-state
    /// reads allocate nothing.
    scratch: Vec<u8>,
}

impl WavReader<BufReader<File>> {
    /// Opens a WAV file from disk.
    ///
    /// # Errors
    ///
    /// Returns `FileError` if the file cannot be opened, or any of the
    /// header errors from [`new`](Self::new).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PlaybackError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| PlaybackError::FileError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> WavReader<R> {
    /// Parses a WAV header from any seekable reader.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWav` if the container is malformed or the audio is
    /// not 16-bit PCM, and `Io` on read failures.
    pub fn new(mut reader: R) -> Result<Self, PlaybackError> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != RIFF_MAGIC {
            return Err(PlaybackError::invalid_wav("missing RIFF header"));
        }
        // Overall RIFF size; chunk walking below bounds us instead.
        let _ = read_u32(&mut reader)?;
        reader.read_exact(&mut magic)?;
        if &magic != WAVE_MAGIC {
            return Err(PlaybackError::invalid_wav("not a WAVE form"));
        }

        let mut format: Option<(u32, u16)> = None;

        loop {
            let mut chunk_id = [0u8; 4];
            if let Err(err) = reader.read_exact(&mut chunk_id) {
                if err.kind() == std::io::ErrorKind::UnexpectedEof {
                    return Err(PlaybackError::invalid_wav("missing data chunk"));
                }
                return Err(err.into());
            }
            let chunk_size = read_u32(&mut reader)?;

            match &chunk_id {
                FMT_CHUNK_ID => {
                    if chunk_size < WAV_FMT_CHUNK_SIZE {
                        return Err(PlaybackError::invalid_wav("truncated fmt chunk"));
                    }
                    let format_code = read_u16(&mut reader)?;
                    let channels = read_u16(&mut reader)?;
                    let sample_rate = read_u32(&mut reader)?;
                    let _byte_rate = read_u32(&mut reader)?;
                    let _block_align = read_u16(&mut reader)?;
                    let bits_per_sample = read_u16(&mut reader)?;

                    if format_code != WAV_FORMAT_PCM {
                        return Err(PlaybackError::invalid_wav(format!(
                            "unsupported format code {format_code} (only PCM)"
                        )));
                    }
                    if bits_per_sample != WAV_BITS_PER_SAMPLE {
                        return Err(PlaybackError::invalid_wav(format!(
                            "unsupported bit depth {bits_per_sample} (only 16-bit)"
                        )));
                    }
                    if channels == 0 || sample_rate == 0 {
                        return Err(PlaybackError::invalid_wav("zero channels or sample rate"));
                    }

                    // Skip any fmt extension bytes.
                    skip_chunk(&mut reader, chunk_size - WAV_FMT_CHUNK_SIZE)?;
                    format = Some((sample_rate, channels));
                }
                DATA_CHUNK_ID => {
                    let (sample_rate, channels) = format.ok_or_else(|| {
                        PlaybackError::invalid_wav("data chunk before fmt chunk")
                    })?;
                    // Clamp to whole samples in case of a corrupt odd size.
                    let data_remaining = u64::from(chunk_size) / BYTES_PER_SAMPLE * BYTES_PER_SAMPLE;
                    return Ok(Self {
                        reader,
                        sample_rate,
                        channels,
                        data_remaining,
                        scratch: Vec::new(),
                    });
                }
                _ => skip_chunk(&mut reader, chunk_size)?,
            }
        }
    }

    /// Returns the sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the number of interleaved channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Returns `true` once every sample has been read.
    pub fn is_exhausted(&self) -> bool {
        self.data_remaining == 0
    }

    /// Fills `buf` with the next interleaved samples.
    ///
    /// Reads up to `buf.len()` samples and zero-fills whatever is left of
    /// `buf`, so a block read across end-of-file still plays as a full
    /// block with a silent tail. Returns the number of samples actually
    /// read (zero once the file is exhausted).
    ///
    /// # Errors
    ///
    /// Returns `Io` if the underlying reader fails mid-chunk.
    pub fn read_block(&mut self, buf: &mut [i16]) -> Result<usize, PlaybackError> {
        let available = (self.data_remaining / BYTES_PER_SAMPLE) as usize;
        let count = buf.len().min(available);

        self.scratch.clear();
        self.scratch.resize(count * BYTES_PER_SAMPLE as usize, 0);
        self.reader.read_exact(&mut self.scratch)?;
        self.data_remaining -= self.scratch.len() as u64;

        for (sample, pair) in buf.iter_mut().zip(self.scratch.chunks_exact(2)) {
            *sample = i16::from_le_bytes([pair[0], pair[1]]);
        }
        buf[count..].fill(0);

        Ok(count)
    }
}

fn read_u16(reader: &mut impl Read) -> std::io::Result<u16> {
    let mut bytes = [0u8; 2];
    reader.read_exact(&mut bytes)?;
    Ok(u16::from_le_bytes(bytes))
}

fn read_u32(reader: &mut impl Read) -> std::io::Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

/// Skips the remainder of a chunk, including the RIFF odd-size pad byte.
fn skip_chunk(reader: &mut impl Seek, size: u32) -> std::io::Result<()> {
    let padded = u64::from(size) + u64::from(size % 2);
    reader.seek(SeekFrom::Current(padded as i64))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Builds an in-memory PCM-16 WAV file.
    fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let data_size = (samples.len() * 2) as u32;
        let byte_rate = sample_rate * u32::from(channels) * 2;
        let block_align = channels * 2;

        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_size).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&byte_rate.to_le_bytes());
        bytes.extend_from_slice(&block_align.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_size.to_le_bytes());
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn parses_header() {
        let bytes = wav_bytes(44100, 2, &[1, -1, 2, -2]);
        let reader = WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.sample_rate(), 44100);
        assert_eq!(reader.channels(), 2);
        assert!(!reader.is_exhausted());
    }

    #[test]
    fn reads_samples_in_order() {
        let bytes = wav_bytes(16000, 1, &[10, -20, 30, -40]);
        let mut reader = WavReader::new(Cursor::new(bytes)).unwrap();

        let mut buf = [0i16; 4];
        assert_eq!(reader.read_block(&mut buf).unwrap(), 4);
        assert_eq!(buf, [10, -20, 30, -40]);
        assert!(reader.is_exhausted());
        assert_eq!(reader.read_block(&mut buf).unwrap(), 0);
        assert_eq!(buf, [0, 0, 0, 0]);
    }

    #[test]
    fn zero_fills_partial_final_block() {
        let bytes = wav_bytes(16000, 1, &[7, 8, 9]);
        let mut reader = WavReader::new(Cursor::new(bytes)).unwrap();

        let mut buf = [99i16; 8];
        assert_eq!(reader.read_block(&mut buf).unwrap(), 3);
        assert_eq!(buf, [7, 8, 9, 0, 0, 0, 0, 0]);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn repeated_reads_stay_correct() {
        // Several block reads in a row, ending in a shorter final read:
        // the reader's internal buffer is reused and resized between them.
        let samples: Vec<i16> = (0..22).collect();
        let bytes = wav_bytes(16000, 1, &samples);
        let mut reader = WavReader::new(Cursor::new(bytes)).unwrap();

        let mut buf = [0i16; 8];
        let mut delivered = Vec::new();
        loop {
            let read = reader.read_block(&mut buf).unwrap();
            if read == 0 {
                break;
            }
            delivered.extend_from_slice(&buf[..read]);
        }
        assert_eq!(delivered, samples);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn skips_unknown_chunks() {
        // Insert a LIST chunk between fmt and data.
        let mut bytes = wav_bytes(8000, 1, &[5, 6]);
        let data_at = bytes.len() - (8 + 4);
        let mut list = Vec::new();
        list.extend_from_slice(b"LIST");
        list.extend_from_slice(&6u32.to_le_bytes());
        list.extend_from_slice(b"INFOab");
        bytes.splice(data_at..data_at, list);

        let mut reader = WavReader::new(Cursor::new(bytes)).unwrap();
        let mut buf = [0i16; 2];
        assert_eq!(reader.read_block(&mut buf).unwrap(), 2);
        assert_eq!(buf, [5, 6]);
    }

    #[test]
    fn rejects_non_riff() {
        let err = WavReader::new(Cursor::new(b"OggS\0\0\0\0".to_vec())).unwrap_err();
        assert!(matches!(err, PlaybackError::InvalidWav { .. }));
    }

    #[test]
    fn rejects_non_pcm() {
        let mut bytes = wav_bytes(8000, 1, &[0]);
        // Patch the format code (offset 20) to 3 = IEEE float.
        bytes[20] = 3;
        let err = WavReader::new(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, PlaybackError::InvalidWav { .. }));
    }

    #[test]
    fn rejects_missing_data_chunk() {
        let bytes = wav_bytes(8000, 1, &[1, 2]);
        // Chop off the data chunk entirely.
        let truncated = bytes[..bytes.len() - (8 + 4)].to_vec();
        let err = WavReader::new(Cursor::new(truncated)).unwrap_err();
        assert!(matches!(err, PlaybackError::InvalidWav { .. }));
    }
}
