use super::*;

const HARNESS_RESULTS_VERSION: u32 = 1;

pub fn run(args: HarnessArgs) -> Result<()> {
    let repo_root = args.repo_root.clone();
    let profiles_dir = resolve_repo_path(&repo_root, &args.profiles);
    let out_path = resolve_repo_path(&repo_root, &args.out);
    let mode = resolve_snapshot_mode(args.update_expected);

    info!(
        profiles = %profiles_dir.display(),
        snapshot_mode = mode.as_str(),
        "starting harness"
    );

    let profile_paths = discover_profiles(&profiles_dir)?;
    if profile_paths.is_empty() {
        bail!("no harness profiles found in {}", profiles_dir.display());
    }

    let results = profile_paths
        .iter()
        .map(|path| run_profile_file(path, &repo_root, mode))
        .collect::<Vec<HarnessCaseResult>>();

    let summary = results
        .iter()
        .map(|result| (result.profile_id.clone(), result.status))
        .collect::<BTreeMap<String, CaseStatus>>();

    let failures = results
        .iter()
        .filter(|result| result.status.is_failure())
        .map(|result| format!("{}={}", result.profile_id, result.status.as_str()))
        .collect::<Vec<String>>();

    let harness_results = HarnessResults {
        manifest_version: HARNESS_RESULTS_VERSION,
        generated_at: now_utc_string(),
        snapshot_mode: mode.as_str().to_string(),
        summary,
        results,
    };
    write_json_pretty(&out_path, &canonical_value(&harness_results)?)?;

    for (profile_id, status) in &harness_results.summary {
        info!(profile = %profile_id, status = status.as_str(), "harness case");
    }
    info!(
        cases = harness_results.results.len(),
        failures = failures.len(),
        out = %out_path.display(),
        "harness completed"
    );

    if !failures.is_empty() {
        bail!("harness failures: {}", failures.join(", "));
    }

    Ok(())
}

pub fn resolve_repo_path(repo_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        repo_root.join(path)
    }
}

pub fn discover_profiles(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    let mut profiles = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext, "yaml" | "yml"));
        if is_yaml {
            profiles.push(path);
        }
    }

    profiles.sort();
    Ok(profiles)
}

pub fn load_profile(path: &Path) -> Result<HarnessProfile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read profile {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("invalid profile {}", path.display()))
}

/// A broken profile becomes an `ERROR` result; the remaining profiles still run.
pub fn run_profile_file(path: &Path, repo_root: &Path, mode: SnapshotMode) -> HarnessCaseResult {
    let profile_path = path.display().to_string();

    let profile = match load_profile(path) {
        Ok(profile) => profile,
        Err(err) => {
            let fallback_id = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| profile_path.clone());
            return error_result(fallback_id, profile_path, &err);
        }
    };

    match run_case(&profile, repo_root, mode, &profile_path) {
        Ok(result) => result,
        Err(err) => error_result(profile.id, profile_path, &err),
    }
}

fn error_result(
    profile_id: String,
    profile_path: String,
    err: &anyhow::Error,
) -> HarnessCaseResult {
    let message = err
        .chain()
        .map(ToString::to_string)
        .collect::<Vec<String>>()
        .join(": ");
    warn!(profile = %profile_id, error = %message, "harness case failed");

    HarnessCaseResult {
        profile_id,
        profile_path,
        status: CaseStatus::Error,
        hash_sha256: None,
        error: Some(message),
        case: None,
    }
}

pub fn run_case(
    profile: &HarnessProfile,
    repo_root: &Path,
    mode: SnapshotMode,
    profile_path: &str,
) -> Result<HarnessCaseResult> {
    if profile.mode != STRUCT_N_MODE {
        bail!("unsupported harness mode {:?}", profile.mode);
    }

    let thresholds = profile.thresholds()?;
    let policy = profile.policy();
    policy.validate()?;

    let fixture_path = resolve_repo_path(repo_root, Path::new(&profile.fixture));
    info!(
        profile = %profile.id,
        adapter = profile.adapter_id.as_str(),
        fixture = %fixture_path.display(),
        "running harness case"
    );
    let extraction = extract_with_adapter(profile, &fixture_path)?;

    let config = PipelineConfig {
        thresholds,
        policy,
        pre_key: profile.pre_key.clone(),
        post_key: profile.post_key.clone(),
        with_e: true,
    };
    let report = run_counts(extraction, &config)?;

    let case = HarnessCaseReport {
        meta: HarnessMeta {
            profile_id: profile.id.clone(),
            mode: profile.mode.clone(),
            ingestion: profile.ingestion.clone(),
            adapter_id: profile.adapter_id,
            kernel: STRUCT_N_KERNEL.to_string(),
            fixture: profile.fixture.clone(),
            pre_key: profile.pre_key.clone(),
            post_key: profile.post_key.clone(),
            thresholds,
            policy,
        },
        report,
    };
    let digest = canonical_digest(&case)?;

    let status = match profile.expected.as_deref() {
        Some(expected) => {
            let expected_path = resolve_repo_path(repo_root, Path::new(expected));
            CaseStatus::from(check_snapshot(&expected_path, &case, &digest, mode)?)
        }
        None => CaseStatus::NoExpected,
    };

    Ok(HarnessCaseResult {
        profile_id: profile.id.clone(),
        profile_path: profile_path.to_string(),
        status,
        hash_sha256: Some(digest),
        error: None,
        case: Some(case),
    })
}
