use carvegen_core::{CorpusFile, Context, Error, Fragment, FragmentationError, Randomness};
use std::path::Path;

fn corpus() -> tempfile::TempDir {
    let td = tempfile::tempdir().unwrap();
    std::fs::write(td.path().join("512"), vec![b'A'; 512]).unwrap();
    std::fs::write(td.path().join("2000"), vec![b'B'; 2000]).unwrap();
    let pattern: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(td.path().join("4096"), pattern).unwrap();
    std::fs::create_dir(td.path().join("sub")).unwrap();
    std::fs::write(td.path().join("sub").join("100"), vec![b'C'; 100]).unwrap();
    std::fs::write(td.path().join("empty"), b"").unwrap();
    td
}

fn offsets(frags: &[Fragment]) -> Vec<(u64, u64)> {
    frags.iter().map(|f| (f.file_offsets().start, f.file_offsets().end)).collect()
}

fn fragmentation_err(e: Error) -> FragmentationError {
    match e {
        Error::Fragmentation(f) => f,
        other => panic!("expected fragmentation error, got {other:?}"),
    }
}

#[test]
fn open_reports_size_and_relative_path() {
    let td = corpus();
    let ctx = Context::new(td.path());
    let f = CorpusFile::open(&ctx, "sub/100").unwrap();
    assert_eq!(f.size(), 100);
    assert_eq!(f.rel_path(), Path::new("sub/100"));
    assert_eq!(f.id().len(), 32);

    let abs = CorpusFile::open(&ctx, td.path().join("2000")).unwrap();
    assert_eq!(abs.rel_path(), Path::new("2000"));
}

#[test]
fn open_rejects_bad_lookups() {
    let td = corpus();
    let ctx = Context::new(td.path());
    assert!(matches!(CorpusFile::open(&ctx, "missing"), Err(Error::FileNotFound(_))));
    assert!(matches!(CorpusFile::open(&ctx, "sub"), Err(Error::NotAFile(_))));
    assert!(matches!(CorpusFile::open(&ctx, "empty"), Err(Error::EmptyFile(_))));
    assert!(matches!(CorpusFile::open(&ctx, "../etc/passwd"), Err(Error::PathEscapesCorpus(_))));

    let none = Context::without_corpus();
    assert!(matches!(CorpusFile::open(&none, "512"), Err(Error::NoCorpus)));

    let gone = Context::new(td.path().join("nope"));
    assert!(matches!(CorpusFile::open(&gone, "512"), Err(Error::CorpusNotFound(_))));
}

#[test]
fn clones_share_id_and_hash() {
    let td = corpus();
    let ctx = Context::new(td.path());
    let a = CorpusFile::open(&ctx, "512").unwrap();
    let b = a.clone();
    assert_eq!(a.id(), b.id());
    assert_eq!(
        a.hash().unwrap(),
        "32beecb58a128af8248504600bd203dcc676adf41045300485655e6b8780a01d"
    );
    assert_eq!(a.hash().unwrap(), b.hash().unwrap());

    let c = CorpusFile::open(&ctx, "512").unwrap();
    assert_ne!(a.id(), c.id());
}

#[test]
fn no_points_yields_whole_file() {
    let td = corpus();
    let ctx = Context::new(td.path());
    let f = CorpusFile::open(&ctx, "2000").unwrap();
    let frags = f.fragment(&[], 512).unwrap();
    assert_eq!(frags.len(), 1);
    assert_eq!(frags[0].number(), 1);
    assert_eq!(offsets(&frags), vec![(0, 2000)]);
}

#[test]
fn points_partition_the_file() {
    let td = corpus();
    let ctx = Context::new(td.path());
    let f = CorpusFile::open(&ctx, "4096").unwrap();
    let frags = f.fragment(&[6, 2, 3], 512).unwrap();
    assert_eq!(offsets(&frags), vec![(0, 1024), (1024, 1536), (1536, 3072), (3072, 4096)]);
    let numbers: Vec<u64> = frags.iter().map(Fragment::number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    assert!(frags.iter().all(|x| x.id() == f.id()));

    let bytes: Vec<u8> = frags.iter().flat_map(|x| x.read_all().unwrap()).collect();
    assert_eq!(bytes, std::fs::read(td.path().join("4096")).unwrap());
}

#[test]
fn unaligned_tail_can_be_cut_off() {
    let td = corpus();
    let ctx = Context::new(td.path());
    let f = CorpusFile::open(&ctx, "2000").unwrap();
    assert_eq!(f.max_fragments(512).unwrap(), 4);
    let frags = f.fragment(&[1, 2, 3], 512).unwrap();
    assert_eq!(offsets(&frags), vec![(0, 512), (512, 1024), (1024, 1536), (1536, 2000)]);
    assert!(frags[3].is_source_tail());
    assert!(!frags[2].is_source_tail());
}

#[test]
fn invalid_points_are_rejected() {
    let td = corpus();
    let ctx = Context::new(td.path());
    let f = CorpusFile::open(&ctx, "4096").unwrap();

    let e = fragmentation_err(f.fragment(&[0], 512).unwrap_err());
    assert_eq!(e, FragmentationError::ZeroPoint);

    let e = fragmentation_err(f.fragment(&[8], 512).unwrap_err());
    assert_eq!(e, FragmentationError::PointTooLarge { point: 8, limit: 8 });

    let e = fragmentation_err(f.fragment(&[3, 3], 512).unwrap_err());
    assert_eq!(e, FragmentationError::DuplicatePoint(3));

    let small = CorpusFile::open(&ctx, "sub/100").unwrap();
    let e = fragmentation_err(small.fragment(&[1], 512).unwrap_err());
    assert_eq!(e, FragmentationError::FileTooSmall { size: 100, block_size: 512 });

    assert!(matches!(f.fragment(&[1], 0), Err(Error::InvalidBlockSize)));
    assert!(matches!(f.max_fragments(0), Err(Error::InvalidBlockSize)));
}

#[test]
fn evenly_spreads_blocks() {
    let td = corpus();
    let ctx = Context::new(td.path());
    let f = CorpusFile::open(&ctx, "4096").unwrap();

    let three = f.fragment_evenly(3, 512).unwrap();
    assert_eq!(offsets(&three), vec![(0, 1536), (1536, 3072), (3072, 4096)]);

    let five = f.fragment_evenly(5, 512).unwrap();
    assert_eq!(
        offsets(&five),
        vec![(0, 1024), (1024, 2048), (2048, 3072), (3072, 3584), (3584, 4096)]
    );

    let one = f.fragment_evenly(1, 512).unwrap();
    assert_eq!(offsets(&one), vec![(0, 4096)]);
}

#[test]
fn evenly_uses_the_tail_as_last_fragment() {
    let td = corpus();
    let ctx = Context::new(td.path());
    let f = CorpusFile::open(&ctx, "2000").unwrap();
    let frags = f.fragment_evenly(4, 512).unwrap();
    assert_eq!(offsets(&frags), vec![(0, 512), (512, 1024), (1024, 1536), (1536, 2000)]);
}

#[test]
fn fragment_counts_are_bounded() {
    let td = corpus();
    let ctx = Context::new(td.path());
    let f = CorpusFile::open(&ctx, "4096").unwrap();
    let mut rng = Randomness::with_seed(7);

    let e = fragmentation_err(f.fragment_evenly(9, 512).unwrap_err());
    assert_eq!(e, FragmentationError::TooManyFragments { requested: 9, max: 8 });

    let e = fragmentation_err(f.fragment_randomly(&mut rng, Some(0), 512).unwrap_err());
    assert_eq!(e, FragmentationError::TooFewFragments);

    let e = fragmentation_err(f.fragment_randomly(&mut rng, Some(9), 512).unwrap_err());
    assert_eq!(e, FragmentationError::TooManyFragments { requested: 9, max: 8 });
}

#[test]
fn random_fragmentation_honours_requested_count() {
    let td = corpus();
    let ctx = Context::new(td.path());
    let f = CorpusFile::open(&ctx, "4096").unwrap();
    let mut rng = Randomness::with_seed(1234);
    for n in 1..=8 {
        let frags = f.fragment_randomly(&mut rng, Some(n), 512).unwrap();
        assert_eq!(frags.len(), n);
        assert_eq!(frags[0].file_offsets().start, 0);
        assert_eq!(frags[n - 1].file_offsets().end, 4096);
        for w in frags.windows(2) {
            assert_eq!(w[0].file_offsets().end, w[1].file_offsets().start);
            assert_eq!(w[0].file_offsets().end % 512, 0);
        }
    }
}

#[test]
fn random_fragmentation_draws_a_count_when_unset() {
    let td = corpus();
    let ctx = Context::new(td.path());
    let f = CorpusFile::open(&ctx, "4096").unwrap();
    let mut rng = Randomness::with_seed(99);
    for _ in 0..32 {
        let n = f.fragment_randomly(&mut rng, None, 512).unwrap().len();
        assert!((1..=8).contains(&n));
    }
}

#[test]
fn same_seed_same_cuts() {
    let td = corpus();
    let ctx = Context::new(td.path());
    let f = CorpusFile::open(&ctx, "4096").unwrap();
    let a = f.fragment_randomly(&mut Randomness::with_seed(5), Some(4), 512).unwrap();
    let b = f.fragment_randomly(&mut Randomness::with_seed(5), Some(4), 512).unwrap();
    assert_eq!(offsets(&a), offsets(&b));
}
