use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn create_query_fasta(path: &Path) {
    // k=4 k-mers: AAAA AAAC AACC ACCC CCCC; reverse complements:
    // GGGG GGGT GGTT GTTT TTTT
    fs::write(path, ">query\nAAAACCCC\n").unwrap();
}

fn fastq_record(id: &str, seq: &str) -> String {
    format!("@{id}\n{seq}\n+\n{}\n", "I".repeat(seq.len()))
}

/// Three pairs: pair a matches on mate 1 (AAAA), pair b matches on mate 2
/// (TTTT, a reverse-complement query k-mer), pair c matches nothing.
fn create_paired_fastq(path1: &Path, path2: &Path) {
    let r1 = [
        fastq_record("a", "TGTGAAAATGTG"),
        fastq_record("b", "TGTGTGTGTGTG"),
        fastq_record("c", "TGTGTGTGTGTG"),
    ]
    .concat();
    let r2 = [
        fastq_record("a", "CACACACACACA"),
        fastq_record("b", "CACATTTTCACA"),
        fastq_record("c", "CACACACACACA"),
    ]
    .concat();
    fs::write(path1, r1).unwrap();
    fs::write(path2, r2).unwrap();
}

fn record_ids(fastq: &str) -> Vec<String> {
    fastq
        .lines()
        .step_by(4)
        .map(|l| l.trim_start_matches('@').to_string())
        .collect()
}

#[test]
fn test_paired_filtering_end_to_end() {
    let temp_dir = tempdir().unwrap();
    let query_path = temp_dir.path().join("query.fa");
    let r1_path = temp_dir.path().join("r1.fastq");
    let r2_path = temp_dir.path().join("r2.fastq");
    let out1_path = temp_dir.path().join("out1.fastq");
    let out2_path = temp_dir.path().join("out2.fastq");
    let summary_path = temp_dir.path().join("summary.json");

    create_query_fasta(&query_path);
    create_paired_fastq(&r1_path, &r2_path);

    let mut cmd = Command::cargo_bin("readsieve").unwrap();
    cmd.arg("--query")
        .arg(&query_path)
        .arg("--in1")
        .arg(&r1_path)
        .arg("--in2")
        .arg(&r2_path)
        .arg("--out1")
        .arg(&out1_path)
        .arg("--out2")
        .arg(&out2_path)
        .arg("-k")
        .arg("4")
        .arg("--summary")
        .arg(&summary_path)
        .arg("--quiet")
        .assert()
        .success();

    let out1 = fs::read_to_string(&out1_path).unwrap();
    let out2 = fs::read_to_string(&out2_path).unwrap();
    assert_eq!(record_ids(&out1), ["a", "b"]);
    assert_eq!(record_ids(&out2), ["a", "b"]);
    // Mates stay paired and sequences pass through untouched
    assert!(out1.contains("TGTGAAAATGTG"));
    assert!(out2.contains("CACATTTTCACA"));

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary_path).unwrap()).unwrap();
    assert_eq!(summary["pairs_in"], 3);
    assert_eq!(summary["pairs_out"], 2);
    assert_eq!(summary["k"], 4);
}

#[test]
fn test_single_threaded_matches_concurrent() {
    let temp_dir = tempdir().unwrap();
    let query_path = temp_dir.path().join("query.fa");
    let r1_path = temp_dir.path().join("r1.fastq");
    let r2_path = temp_dir.path().join("r2.fastq");

    create_query_fasta(&query_path);

    // Enough pairs, at a tiny chunk size, for chunks to complete out of
    // order if ordering were broken.
    let mut r1 = String::new();
    let mut r2 = String::new();
    for i in 0..500 {
        let seq1 = if i % 7 == 0 {
            "GTGTAAAAGTGT"
        } else {
            "GTGTGTGTGTGT"
        };
        r1.push_str(&fastq_record(&format!("p{i}"), seq1));
        r2.push_str(&fastq_record(&format!("p{i}"), "CACACACACACA"));
    }
    fs::write(&r1_path, &r1).unwrap();
    fs::write(&r2_path, &r2).unwrap();

    let run = |args: &[&str], out1: &Path, out2: &Path| {
        let mut cmd = Command::cargo_bin("readsieve").unwrap();
        cmd.arg("--query")
            .arg(&query_path)
            .arg("--in1")
            .arg(&r1_path)
            .arg("--in2")
            .arg(&r2_path)
            .arg("--out1")
            .arg(out1)
            .arg("--out2")
            .arg(out2)
            .arg("-k")
            .arg("4")
            .arg("--quiet")
            .args(args)
            .assert()
            .success();
    };

    let seq_out1 = temp_dir.path().join("seq1.fastq");
    let seq_out2 = temp_dir.path().join("seq2.fastq");
    run(&["--single-threaded"], &seq_out1, &seq_out2);

    let conc_out1 = temp_dir.path().join("conc1.fastq");
    let conc_out2 = temp_dir.path().join("conc2.fastq");
    run(
        &["--threads", "4", "--chunk-size", "3"],
        &conc_out1,
        &conc_out2,
    );

    let sequential = fs::read_to_string(&seq_out1).unwrap();
    let concurrent = fs::read_to_string(&conc_out1).unwrap();
    assert!(!sequential.is_empty());
    assert_eq!(sequential, concurrent);
    assert_eq!(
        fs::read_to_string(&seq_out2).unwrap(),
        fs::read_to_string(&conc_out2).unwrap()
    );

    // Emitted positions strictly increase
    let ids = record_ids(&concurrent);
    let positions: Vec<usize> = ids.iter().map(|id| id[1..].parse().unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(positions, (0..500).filter(|i| i % 7 == 0).collect::<Vec<_>>());
}

#[test]
fn test_rc_flag_matches_reverse_complement_in_mate1() {
    let temp_dir = tempdir().unwrap();
    let query_path = temp_dir.path().join("query.fa");
    let r1_path = temp_dir.path().join("r1.fastq");
    let r2_path = temp_dir.path().join("r2.fastq");

    create_query_fasta(&query_path);
    // GGGG is the reverse complement of query k-mer CCCC: mate 1 only
    // matches it when --rc merges both orientations.
    fs::write(&r1_path, fastq_record("a", "TGTGGGGGTGTG")).unwrap();
    fs::write(&r2_path, fastq_record("a", "CACACACACACA")).unwrap();

    let run_with = |rc: bool, out1: &Path, out2: &Path| {
        let mut cmd = Command::cargo_bin("readsieve").unwrap();
        cmd.arg("--query")
            .arg(&query_path)
            .arg("--in1")
            .arg(&r1_path)
            .arg("--in2")
            .arg(&r2_path)
            .arg("--out1")
            .arg(out1)
            .arg("--out2")
            .arg(out2)
            .arg("-k")
            .arg("4")
            .arg("--quiet");
        if rc {
            cmd.arg("--rc");
        }
        cmd.assert().success();
    };

    let out1 = temp_dir.path().join("norc1.fastq");
    let out2 = temp_dir.path().join("norc2.fastq");
    run_with(false, &out1, &out2);
    assert!(fs::read_to_string(&out1).unwrap().is_empty());

    let out1 = temp_dir.path().join("rc1.fastq");
    let out2 = temp_dir.path().join("rc2.fastq");
    run_with(true, &out1, &out2);
    assert_eq!(record_ids(&fs::read_to_string(&out1).unwrap()), ["a"]);
}

#[test]
fn test_gzip_output() {
    let temp_dir = tempdir().unwrap();
    let query_path = temp_dir.path().join("query.fa");
    let r1_path = temp_dir.path().join("r1.fastq");
    let r2_path = temp_dir.path().join("r2.fastq");
    let out1_path = temp_dir.path().join("out1.fastq.gz");
    let out2_path = temp_dir.path().join("out2.fastq.gz");

    create_query_fasta(&query_path);
    create_paired_fastq(&r1_path, &r2_path);

    let mut cmd = Command::cargo_bin("readsieve").unwrap();
    cmd.arg("--query")
        .arg(&query_path)
        .arg("--in1")
        .arg(&r1_path)
        .arg("--in2")
        .arg(&r2_path)
        .arg("--out1")
        .arg(&out1_path)
        .arg("--out2")
        .arg(&out2_path)
        .arg("-k")
        .arg("4")
        .arg("--quiet")
        .assert()
        .success();

    // Gzip magic bytes
    let compressed = fs::read(&out1_path).unwrap();
    assert!(compressed.len() > 2);
    assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
}

#[test]
fn test_refuses_to_overwrite_without_force() {
    let temp_dir = tempdir().unwrap();
    let query_path = temp_dir.path().join("query.fa");
    let r1_path = temp_dir.path().join("r1.fastq");
    let r2_path = temp_dir.path().join("r2.fastq");
    let out1_path = temp_dir.path().join("out1.fastq");
    let out2_path = temp_dir.path().join("out2.fastq");

    create_query_fasta(&query_path);
    create_paired_fastq(&r1_path, &r2_path);
    fs::write(&out1_path, "existing").unwrap();

    let base_args = |cmd: &mut Command| {
        cmd.arg("--query")
            .arg(&query_path)
            .arg("--in1")
            .arg(&r1_path)
            .arg("--in2")
            .arg(&r2_path)
            .arg("--out1")
            .arg(&out1_path)
            .arg("--out2")
            .arg(&out2_path)
            .arg("-k")
            .arg("4")
            .arg("--quiet");
    };

    let mut cmd = Command::cargo_bin("readsieve").unwrap();
    base_args(&mut cmd);
    cmd.assert().failure().code(1);

    let mut cmd = Command::cargo_bin("readsieve").unwrap();
    base_args(&mut cmd);
    cmd.arg("--force").assert().success();
}

#[test]
fn test_invalid_k_fails_with_exit_code_one() {
    let temp_dir = tempdir().unwrap();
    let query_path = temp_dir.path().join("query.fa");
    let r1_path = temp_dir.path().join("r1.fastq");
    let r2_path = temp_dir.path().join("r2.fastq");

    create_query_fasta(&query_path);
    create_paired_fastq(&r1_path, &r2_path);

    let mut cmd = Command::cargo_bin("readsieve").unwrap();
    cmd.arg("--query")
        .arg(&query_path)
        .arg("--in1")
        .arg(&r1_path)
        .arg("--in2")
        .arg(&r2_path)
        .arg("--out1")
        .arg(temp_dir.path().join("o1.fastq"))
        .arg("--out2")
        .arg(temp_dir.path().join("o2.fastq"))
        .arg("-k")
        .arg("65")
        .arg("--quiet")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_ambiguous_query_fails() {
    let temp_dir = tempdir().unwrap();
    let query_path = temp_dir.path().join("query.fa");
    let r1_path = temp_dir.path().join("r1.fastq");
    let r2_path = temp_dir.path().join("r2.fastq");

    fs::write(&query_path, ">query\nAAAANCCCC\n").unwrap();
    create_paired_fastq(&r1_path, &r2_path);

    let mut cmd = Command::cargo_bin("readsieve").unwrap();
    cmd.arg("--query")
        .arg(&query_path)
        .arg("--in1")
        .arg(&r1_path)
        .arg("--in2")
        .arg(&r2_path)
        .arg("--out1")
        .arg(temp_dir.path().join("o1.fastq"))
        .arg("--out2")
        .arg(temp_dir.path().join("o2.fastq"))
        .arg("-k")
        .arg("4")
        .arg("--quiet")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_uneven_inputs_stop_at_shorter_stream() {
    let temp_dir = tempdir().unwrap();
    let query_path = temp_dir.path().join("query.fa");
    let r1_path = temp_dir.path().join("r1.fastq");
    let r2_path = temp_dir.path().join("r2.fastq");
    let out1_path = temp_dir.path().join("out1.fastq");
    let out2_path = temp_dir.path().join("out2.fastq");
    let summary_path = temp_dir.path().join("summary.json");

    create_query_fasta(&query_path);
    let r1 = [
        fastq_record("a", "TGTGAAAATGTG"),
        fastq_record("b", "TGTGAAAATGTG"),
    ]
    .concat();
    // Mate 2 stream has only one record
    fs::write(&r1_path, r1).unwrap();
    fs::write(&r2_path, fastq_record("a", "CACACACACACA")).unwrap();

    let mut cmd = Command::cargo_bin("readsieve").unwrap();
    cmd.arg("--query")
        .arg(&query_path)
        .arg("--in1")
        .arg(&r1_path)
        .arg("--in2")
        .arg(&r2_path)
        .arg("--out1")
        .arg(&out1_path)
        .arg("--out2")
        .arg(&out2_path)
        .arg("-k")
        .arg("4")
        .arg("--summary")
        .arg(&summary_path)
        .arg("--quiet")
        .assert()
        .success();

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary_path).unwrap()).unwrap();
    assert_eq!(summary["pairs_in"], 1);
    assert_eq!(record_ids(&fs::read_to_string(&out1_path).unwrap()), ["a"]);
}
