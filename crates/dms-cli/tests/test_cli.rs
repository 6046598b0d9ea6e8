use assert_cmd::Command;
use candle_core::Device;
use dms_test_data::TestFile;

fn output_file() -> tempfile::NamedTempFile {
    tempfile::Builder::new()
        .suffix(".safetensors")
        .tempfile()
        .unwrap()
}

#[test]
fn test_cli_collate_autoreg() {
    let (config, _c) = TestFile::config_autoreg().create_temp().unwrap();
    let (fasta, _f) = TestFile::sequences_01().create_temp().unwrap();
    let output = output_file();

    let mut cmd = Command::cargo_bin("dms").unwrap();
    cmd.arg("collate")
        .arg("--config")
        .arg(&config)
        .arg("--input")
        .arg(&fasta)
        .arg("--output")
        .arg(output.path())
        .arg("--seed")
        .arg("3");
    cmd.assert().success();

    let tensors = candle_core::safetensors::load(output.path(), &Device::Cpu).unwrap();
    let mut names: Vec<_> = tensors.keys().cloned().collect();
    names.sort();
    assert_eq!(names, vec!["mask", "src", "tgt", "timesteps"]);
    // four records, padded to the 86-residue beta chain
    assert_eq!(tensors["src"].dims(), &[4, 86]);
    assert_eq!(tensors["timesteps"].dims(), &[4]);
}

#[test]
fn test_cli_collate_d3pm_is_seeded() {
    let (config, _c) = TestFile::config_random().create_temp().unwrap();
    let (fasta, _f) = TestFile::sequences_01().create_temp().unwrap();
    let first = output_file();
    let second = output_file();

    for output in [&first, &second] {
        let mut cmd = Command::cargo_bin("dms").unwrap();
        cmd.arg("collate")
            .arg("--config")
            .arg(&config)
            .arg("--input")
            .arg(&fasta)
            .arg("--output")
            .arg(output.path());
        cmd.assert().success();
    }

    let a = candle_core::safetensors::load(first.path(), &Device::Cpu).unwrap();
    let b = candle_core::safetensors::load(second.path(), &Device::Cpu).unwrap();
    assert_eq!(a.len(), 8);
    assert_eq!(a["q"].dims(), &[101, 26, 26]);
    assert_eq!(a["q_x"].dims(), &[4, 86, 26]);
    assert_eq!(
        a["src"].to_vec2::<u32>().unwrap(),
        b["src"].to_vec2::<u32>().unwrap()
    );
}

#[test]
fn test_cli_collate_msa() {
    let (config, _c) = TestFile::config_blosum().create_temp().unwrap();
    let (msa_01, _m1) = TestFile::msa_01().create_temp().unwrap();
    let (msa_02, _m2) = TestFile::msa_02().create_temp().unwrap();
    let output = output_file();

    let mut cmd = Command::cargo_bin("dms").unwrap();
    cmd.arg("collate")
        .arg("--config")
        .arg(&config)
        .arg("--input")
        .arg(&msa_01)
        .arg(&msa_02)
        .arg("--output")
        .arg(output.path())
        .arg("--msa");
    cmd.assert().success();

    let tensors = candle_core::safetensors::load(output.path(), &Device::Cpu).unwrap();
    assert_eq!(tensors["src"].dims(), &[2, 4, 20]);
    assert_eq!(tensors["src_one_hot"].dims(), &[2, 4, 20, 27]);
    assert_eq!(tensors["q_bar"].dims(), &[501, 27, 27]);
}

#[test]
fn test_cli_schedule() {
    let output = output_file();
    let mut cmd = Command::cargo_bin("dms").unwrap();
    cmd.arg("schedule")
        .arg("--kind")
        .arg("blosum")
        .arg("--timesteps")
        .arg("50")
        .arg("--betas")
        .arg("cosine")
        .arg("--msa")
        .arg("--output")
        .arg(output.path());
    cmd.assert().success();

    let tensors = candle_core::safetensors::load(output.path(), &Device::Cpu).unwrap();
    assert_eq!(tensors["q"].dims(), &[51, 27, 27]);
    assert_eq!(tensors["q_bar"].dims(), &[51, 27, 27]);
}

#[test]
fn test_cli_schedule_rejects_autoreg() {
    let output = output_file();
    let mut cmd = Command::cargo_bin("dms").unwrap();
    cmd.arg("schedule")
        .arg("--kind")
        .arg("autoreg")
        .arg("--timesteps")
        .arg("50")
        .arg("--output")
        .arg(output.path());
    cmd.assert().failure();
}
