use eyre::{bail, eyre, WrapErr};
use tracing::info;

use super::dedup_ids;
use crate::{clients::OperatorDirectory, dkg::DkgRunner, problems::ProblemLog};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingReport {
    pub reachable: Vec<u64>,
    pub problems: ProblemLog<u64>,
}

async fn ping_operator(
    directory: &dyn OperatorDirectory,
    dkg: &dyn DkgRunner,
    id: u64,
) -> eyre::Result<()> {
    let operator =
        directory.operator(id).await?.ok_or_else(|| eyre!("Operator {id} does not exist"))?;
    let Some(endpoint) = operator.dkg_endpoint() else {
        bail!("Operator {id} does not have a DKG endpoint set");
    };
    info!(operator = id, endpoint, "pinging DKG endpoint");
    dkg.ping(&[endpoint.to_string()])
        .await
        .wrap_err_with(|| format!("DKG ping failed for operator {id}"))
}

/// Check the DKG endpoint of every operator in `operator_ids`.
pub async fn ping_operators(
    directory: &dyn OperatorDirectory,
    dkg: &dyn DkgRunner,
    operator_ids: &[u64],
) -> PingReport {
    let mut reachable = Vec::new();
    let mut problems = ProblemLog::new();
    for id in dedup_ids(operator_ids) {
        match ping_operator(directory, dkg, id).await {
            Ok(()) => reachable.push(id),
            Err(err) => problems.record(id, format!("{err:#}")),
        }
    }
    PingReport { reachable, problems }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::mocks::{MockDirectory, MockDkg};

    #[tokio::test]
    async fn test_ping_operators() -> eyre::Result<()> {
        let mut directory = MockDirectory::with_operators(&[4, 5, 6]);
        directory.insert_without_endpoint(7);
        let dkg = MockDkg::new()?.failing_for(5);

        let report = ping_operators(&directory, &dkg, &[4, 5, 6, 7, 8, 4]).await;

        assert_eq!(report.reachable, vec![4, 6]);
        assert_eq!(report.problems.keys().copied().collect::<Vec<_>>(), vec![5, 7, 8]);
        assert_eq!(
            dkg.pinged(),
            vec!["https://10.0.0.4:3030", "https://10.0.0.5:3030", "https://10.0.0.6:3030"]
        );
        Ok(())
    }
}
