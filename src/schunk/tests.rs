use std::io::Cursor;
use std::sync::RwLock;

use super::*;
use crate::chunk::format::{write_chunk, ChunkLayout};
use crate::config::{CodecKind, FilterKind};

fn ramp_chunk(index: usize, len: usize) -> Vec<f64> {
    (0..len).map(|i| (index * len + i) as f64 * 0.25).collect()
}

fn lossless_config(chunk_len: usize) -> SchunkConfig {
    SchunkConfig::for_f64(chunk_len).with_filters(vec![FilterKind::Shuffle])
}

fn filled(config: SchunkConfig, nchunks: usize) -> SuperChunk {
    let chunk_len = config.chunk_len;
    let mut schunk = SuperChunk::new(config).unwrap();
    for i in 0..nchunks {
        schunk.append(&ramp_chunk(i, chunk_len)).unwrap();
    }
    schunk
}

#[test]
fn test_append_and_decompress_roundtrip_is_bit_identical() {
    for codec in [CodecKind::None, CodecKind::Lz4, CodecKind::Zstd] {
        let schunk = filled(lossless_config(1000).with_codec(codec), 3);
        for i in 0..3 {
            let mut out = vec![0.0f64; 1000];
            assert_eq!(schunk.decompress_chunk(i, &mut out).unwrap(), 1000);
            assert_eq!(out, ramp_chunk(i, 1000), "codec {}", codec);
        }
    }
}

#[test]
fn test_indices_are_dense_and_monotonic() {
    let mut schunk = SuperChunk::new(lossless_config(16)).unwrap();
    assert!(schunk.is_empty());
    for expected in 0..10 {
        assert_eq!(schunk.append(&ramp_chunk(expected, 16)).unwrap(), expected);
    }
    assert_eq!(schunk.nchunks(), 10);
}

#[test]
fn test_wrong_length_append_leaves_container_untouched() {
    let mut schunk = filled(lossless_config(100), 2);
    let before = schunk.stats();

    let result = schunk.append(&ramp_chunk(0, 99));
    assert!(matches!(
        result,
        Err(SchunkError::SizeMismatch { expected: 100, got: 99 })
    ));
    assert!(schunk.append_buffer(&[0u8; 801]).is_err());
    assert_eq!(schunk.stats(), before);
    assert_eq!(schunk.append(&ramp_chunk(2, 100)).unwrap(), 2);
}

#[test]
fn test_wrong_element_type_is_rejected() {
    let mut schunk = SuperChunk::new(lossless_config(4)).unwrap();
    assert!(matches!(
        schunk.append(&[1.0f32; 4]),
        Err(SchunkError::TypeSizeMismatch { expected: 8, got: 4 })
    ));
    schunk.append(&[1.0f64; 4]).unwrap();
    let mut out = [0u32; 4];
    assert!(matches!(
        schunk.decompress_chunk(0, &mut out),
        Err(SchunkError::TypeSizeMismatch { .. })
    ));
}

#[test]
fn test_invalid_index_leaves_stats_unchanged() {
    let schunk = filled(lossless_config(64), 3);
    let before = schunk.stats();
    let mut out = vec![0.0f64; 64];
    assert!(matches!(
        schunk.decompress_chunk(3, &mut out),
        Err(SchunkError::InvalidIndex { index: 3, count: 3 })
    ));
    assert!(schunk.chunk_info(7).is_err());
    assert_eq!(schunk.stats(), before);
}

#[test]
fn test_buffer_too_small() {
    let schunk = filled(lossless_config(64), 1);
    let mut out = vec![0.0f64; 63];
    assert!(matches!(
        schunk.decompress_chunk(0, &mut out),
        Err(SchunkError::BufferTooSmall { needed: 64, got: 63 })
    ));

    // Larger buffers are fine; only the front is written.
    let mut big = vec![-1.0f64; 70];
    assert_eq!(schunk.decompress_chunk(0, &mut big).unwrap(), 64);
    assert_eq!(big[64..], [-1.0; 6]);
}

#[test]
fn test_stats_accounting() {
    let schunk = filled(lossless_config(500), 4);
    let stats = schunk.stats();
    assert_eq!(stats.nchunks, 4);
    assert_eq!(stats.logical_bytes, 4 * 500 * 8);
    let sum: u64 = (0..4).map(|i| schunk.chunk(i).unwrap().len() as u64).sum();
    assert_eq!(stats.compressed_bytes, sum);
    assert!(stats.ratio() > 1.0);
    assert_eq!(SchunkStats::default().ratio(), 0.0);
}

#[test]
fn test_chunk_info_reports_configuration() {
    let config = SchunkConfig::for_f64(2048)
        .with_codec(CodecKind::Zstd)
        .with_filters(vec![FilterKind::TruncPrec { bits: 23 }, FilterKind::Shuffle])
        .with_blocksize(4096);
    let schunk = filled(config, 1);
    let info = schunk.chunk_info(0).unwrap();
    assert_eq!(info.nitems(), 2048);
    assert_eq!(info.codec, CodecKind::Zstd);
    assert_eq!(info.blocks.len(), 4);
    assert_eq!(info.cbytes(), schunk.chunk(0).unwrap().len());
}

#[test]
fn test_lossy_roundtrip_respects_bound() {
    let bits = 23;
    let schunk = filled(
        SchunkConfig::for_f64(1000).with_filters(vec![FilterKind::TruncPrec { bits }, FilterKind::Shuffle]),
        2,
    );
    let restored: Vec<f64> = schunk.to_vec().unwrap();
    let original: Vec<f64> = (0..2).flat_map(|i| ramp_chunk(i, 1000)).collect();
    for (x, y) in original.iter().zip(&restored) {
        assert!((x - y).abs() <= x.abs() * 2f64.powi(-(bits as i32)));
    }
}

#[test]
fn test_append_chunk_matches_append() {
    let config = lossless_config(256).with_codec(CodecKind::Zstd);
    let reference = filled(config.clone(), 3);

    let mut rebuilt = SuperChunk::new(config).unwrap();
    for i in 0..3 {
        let compressed = reference
            .compress_chunk(bytemuck::cast_slice(&ramp_chunk(i, 256)))
            .unwrap();
        assert_eq!(rebuilt.append_chunk(compressed).unwrap(), i);
    }
    assert_eq!(rebuilt.stats(), reference.stats());
    assert_eq!(rebuilt.to_vec::<f64>().unwrap(), reference.to_vec::<f64>().unwrap());
}

#[test]
fn test_append_chunk_rejects_foreign_chunks() {
    let other = filled(lossless_config(128), 1);
    let mut schunk = SuperChunk::new(lossless_config(64)).unwrap();
    assert!(matches!(
        schunk.append_chunk(other.chunk(0).unwrap().to_vec()),
        Err(SchunkError::SizeMismatch { expected: 64, got: 128 })
    ));

    let zstd = filled(lossless_config(64).with_codec(CodecKind::Zstd), 1);
    assert!(matches!(
        schunk.append_chunk(zstd.chunk(0).unwrap().to_vec()),
        Err(SchunkError::DecodeFailed(_))
    ));
    assert!(schunk.append_chunk(b"garbage".to_vec()).is_err());
    assert!(schunk.is_empty());
}

#[test]
fn test_get_items_agrees_with_full_decode() {
    let schunk = filled(lossless_config(3000).with_blocksize(512), 2);
    let full = ramp_chunk(1, 3000);
    let mut out = vec![0.0f64; 700];
    assert_eq!(schunk.get_items(1, 1234, &mut out).unwrap(), 700);
    assert_eq!(out, full[1234..1934]);

    assert!(matches!(
        schunk.get_items(1, 2500, &mut out),
        Err(SchunkError::SizeMismatch { .. })
    ));
    assert!(matches!(
        schunk.get_items(2, 0, &mut out),
        Err(SchunkError::InvalidIndex { .. })
    ));
}

#[test]
fn test_concurrent_readers_decode_identical_data() {
    let schunk = filled(lossless_config(2000).with_nthreads(2), 8);
    let expected: Vec<f64> = schunk.to_vec().unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    let mut all = Vec::new();
                    let mut out = vec![0.0f64; 2000];
                    for i in 0..schunk.nchunks() {
                        schunk.decompress_chunk(i, &mut out).unwrap();
                        all.extend_from_slice(&out);
                    }
                    all
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn test_indices_stay_dense_while_readers_run() {
    let shared = RwLock::new(filled(lossless_config(512), 1));
    let appends = 12;

    let indices = std::thread::scope(|scope| {
        for _ in 0..3 {
            scope.spawn(|| {
                let mut out = vec![0.0f64; 512];
                for _ in 0..50 {
                    let schunk = shared.read().unwrap();
                    for i in 0..schunk.nchunks() {
                        schunk.decompress_chunk(i, &mut out).unwrap();
                        assert_eq!(out, ramp_chunk(i, 512));
                    }
                }
            });
        }

        let writer = scope.spawn(|| {
            (1..=appends)
                .map(|i| shared.write().unwrap().append(&ramp_chunk(i, 512)).unwrap())
                .collect::<Vec<_>>()
        });
        writer.join().unwrap()
    });

    assert_eq!(indices, (1..=appends).collect::<Vec<_>>());
    let schunk = shared.into_inner().unwrap();
    assert_eq!(schunk.nchunks(), appends + 1);
    assert_eq!(schunk.stats().logical_bytes, ((appends + 1) * 512 * 8) as u64);
}

#[test]
fn test_decompress_chunk_bytes_matches_typed_decode() {
    let schunk = filled(lossless_config(300), 2);
    let mut bytes = vec![0u8; 300 * 8 + 16];
    assert_eq!(schunk.decompress_chunk_bytes(1, &mut bytes).unwrap(), 2400);
    assert_eq!(&bytes[..2400], bytemuck::cast_slice::<f64, u8>(&ramp_chunk(1, 300)));
    assert!(matches!(
        schunk.decompress_chunk_bytes(1, &mut [0u8; 100]),
        Err(SchunkError::BufferTooSmall { needed: 300, got: 12 })
    ));
}

#[test]
fn test_appended_chunk_with_misaligned_blocks_is_rejected() {
    let mut schunk = SuperChunk::new(lossless_config(4)).unwrap();
    // 32 bytes of f64 split into blocks of 12 bytes cut elements in half.
    let layout = ChunkLayout {
        typesize: 8,
        codec: CodecKind::Lz4,
        clevel: 5,
        filters: vec![FilterKind::Shuffle],
        nbytes: 32,
        blocksize: 12,
    };
    let crafted = write_chunk(
        &layout,
        &[(vec![0u8; 12], true), (vec![0u8; 12], true), (vec![0u8; 8], true)],
    );

    assert!(matches!(
        schunk.append_chunk(crafted),
        Err(SchunkError::DecodeFailed(_))
    ));
    assert!(schunk.is_empty());
}

#[test]
fn test_corrupted_chunk_yields_decode_failed() {
    let mut schunk = filled(lossless_config(1024).with_codec(CodecKind::Zstd), 2);
    let last = schunk.chunks[1].len() - 1;
    schunk.chunks[1].truncate(last);

    let mut out = vec![0.0f64; 1024];
    assert!(schunk.decompress_chunk(0, &mut out).is_ok());
    assert!(matches!(
        schunk.decompress_chunk(1, &mut out),
        Err(SchunkError::DecodeFailed(_))
    ));
}

#[test]
fn test_frame_roundtrip_in_memory() {
    let schunk = filled(
        SchunkConfig::for_f64(777).with_codec(CodecKind::Zstd).with_clevel(3),
        5,
    );
    let mut buf = Vec::new();
    schunk.write_to(&mut buf).unwrap();
    assert_eq!(&buf[..4], FRAME_MAGIC);

    let loaded = SuperChunk::read_from(&mut Cursor::new(&buf)).unwrap();
    assert_eq!(loaded.config().as_ref(), schunk.config().as_ref());
    assert_eq!(loaded.stats(), schunk.stats());
    assert_eq!(loaded.to_vec::<f64>().unwrap(), schunk.to_vec::<f64>().unwrap());
}

#[test]
fn test_frame_roundtrip_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ramp.scfr");
    let schunk = filled(lossless_config(100), 3);
    schunk.save(&path).unwrap();

    let loaded = SuperChunk::open(&path).unwrap();
    assert_eq!(loaded.nchunks(), 3);
    assert_eq!(loaded.to_vec::<f64>().unwrap(), schunk.to_vec::<f64>().unwrap());
}

#[test]
fn test_corrupted_frames_are_rejected() {
    let schunk = filled(lossless_config(100), 2);
    let mut buf = Vec::new();
    schunk.write_to(&mut buf).unwrap();

    let mut bad_magic = buf.clone();
    bad_magic[0] = b'Z';
    assert!(matches!(
        SuperChunk::read_from(&mut Cursor::new(&bad_magic)),
        Err(SchunkError::FrameFormatError(_))
    ));

    let truncated = &buf[..buf.len() - 10];
    assert!(matches!(
        SuperChunk::read_from(&mut Cursor::new(truncated)),
        Err(SchunkError::FrameFormatError(_))
    ));

    // Flip the chunk magic of the first chunk.
    let first_chunk = buf.len() - schunk.stats().compressed_bytes as usize;
    let mut bad_chunk = buf.clone();
    bad_chunk[first_chunk] = b'X';
    assert!(matches!(
        SuperChunk::read_from(&mut Cursor::new(&bad_chunk)),
        Err(SchunkError::FrameFormatError(_))
    ));
}

#[test]
fn test_invalid_configuration_is_rejected() {
    assert!(matches!(
        SuperChunk::new(SchunkConfig::for_f64(0)),
        Err(SchunkError::Configuration(_))
    ));
    assert!(SuperChunk::new(SchunkConfig::for_f64(10).with_clevel(12)).is_err());
}
