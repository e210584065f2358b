//! Read-only Solana JSON-RPC lookups. Submission is out of scope for
//! this service; nothing here signs or sends.

use std::str::FromStr;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_sdk::account::Account;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

use crate::agent::types::AgentError;

pub struct ChainReader {
    rpc: RpcClient,
}

impl ChainReader {
    pub fn new(rpc_url: &str) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(
                rpc_url.to_string(),
                CommitmentConfig::confirmed(),
            ),
        }
    }

    /// Lamport balance of an address.
    pub async fn balance(&self, address: &str) -> Result<u64, AgentError> {
        let pubkey = parse_pubkey(address)?;
        self.rpc
            .get_balance(&pubkey)
            .await
            .map_err(|e| AgentError::Rpc(e.to_string()))
    }

    /// Full account info; `None` if the account does not exist.
    pub async fn account(&self, address: &str) -> Result<Option<Account>, AgentError> {
        let pubkey = parse_pubkey(address)?;
        let response = self
            .rpc
            .get_account_with_commitment(&pubkey, CommitmentConfig::confirmed())
            .await
            .map_err(|e| AgentError::Rpc(e.to_string()))?;
        Ok(response.value)
    }

    /// Most recent transaction signatures touching an address.
    pub async fn recent_signatures(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<String>, AgentError> {
        let pubkey = parse_pubkey(address)?;
        let config = GetConfirmedSignaturesForAddress2Config {
            limit: Some(limit),
            ..Default::default()
        };
        let signatures = self
            .rpc
            .get_signatures_for_address_with_config(&pubkey, config)
            .await
            .map_err(|e| AgentError::Rpc(e.to_string()))?;
        Ok(signatures.into_iter().map(|s| s.signature).collect())
    }

    /// Confirmation status for one signature; `None` if the cluster has
    /// no record of it.
    pub async fn signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<Result<(), String>>, AgentError> {
        let signature = Signature::from_str(signature)
            .map_err(|e| AgentError::Rpc(format!("Invalid signature: {}", e)))?;
        let status = self
            .rpc
            .get_signature_status(&signature)
            .await
            .map_err(|e| AgentError::Rpc(e.to_string()))?;
        Ok(status.map(|result| result.map_err(|e| e.to_string())))
    }
}

fn parse_pubkey(address: &str) -> Result<Pubkey, AgentError> {
    Pubkey::from_str(address).map_err(|e| AgentError::Rpc(format!("Invalid pubkey: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Input validation fails before any network round trip, so these run
    // offline.

    #[tokio::test]
    async fn rejects_malformed_pubkeys() {
        let reader = ChainReader::new("http://localhost:8899");
        assert!(reader.balance("not a pubkey").await.is_err());
        assert!(reader.account("0").await.is_err());
        assert!(reader.recent_signatures("!!", 5).await.is_err());
    }

    #[tokio::test]
    async fn rejects_malformed_signatures() {
        let reader = ChainReader::new("http://localhost:8899");
        let err = reader.signature_status("definitely-not-base58!").await;
        assert!(matches!(err, Err(AgentError::Rpc(_))));
    }
}
