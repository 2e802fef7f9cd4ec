//! Seeded release, commit and file-change generation.

use crate::catalog::{AUTHORS, CHANGE_TYPES, COMMIT_MESSAGES, FILES, REPOSITORY};
use crate::config::CountRange;
use crate::error::FixtureError;
use crate::graph::{Entity, FixtureGraph, FixtureGraphExt};
use rand::seq::SliceRandom;
use rand::Rng;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct GeneratedRelease {
    pub release: Entity,
    pub commits: Vec<Entity>,
    pub file_changes: usize,
}

/// 40 lowercase hex chars derived from 16 random bytes.
pub fn random_sha<R: Rng + ?Sized>(rng: &mut R) -> String {
    let seed: [u8; 16] = rng.gen();
    let digest = Sha256::digest(seed);
    digest[..20].iter().map(|b| format!("{b:02x}")).collect()
}

/// Create a release for `project` with a random number of commits, each
/// touching one to three catalog files.
pub fn generate_release<G, R>(
    graph: &mut G,
    rng: &mut R,
    organization: &Entity,
    project: &Entity,
    commits: CountRange,
) -> Result<GeneratedRelease, FixtureError>
where
    G: FixtureGraph + ?Sized,
    R: Rng + ?Sized,
{
    let version = random_sha(rng);
    let release = graph.release(organization, &version)?;
    graph.release_project(&release, project)?;

    let count = rng.gen_range(commits.min..=commits.max) as usize;
    let mut created = Vec::with_capacity(count);
    let mut file_changes = 0;

    for order in 0..count {
        let (name, email) = AUTHORS[rng.gen_range(0..AUTHORS.len())];
        let author = graph.commit_author(organization, name, email)?;
        let message = COMMIT_MESSAGES[rng.gen_range(0..COMMIT_MESSAGES.len())];
        let commit = graph.commit(organization, REPOSITORY, &random_sha(rng), &author, message)?;

        let touched = rng.gen_range(1..=3);
        for filename in FILES.choose_multiple(rng, touched) {
            let change_type = CHANGE_TYPES[rng.gen_range(0..CHANGE_TYPES.len())];
            graph.commit_file_change(&commit, filename, change_type)?;
            file_changes += 1;
        }

        graph.release_commit(&release, &commit, order)?;
        created.push(commit);
    }

    tracing::debug!(
        project = %project.key,
        version = %version,
        commits = created.len(),
        file_changes,
        "generated release"
    );

    Ok(GeneratedRelease {
        release,
        commits: created,
        file_changes,
    })
}
