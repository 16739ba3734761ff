// Responsible for all communication with the Solana cluster.

use crate::crypto::identity::Identity;
use crate::infra::ledger::{LedgerError, LedgerGateway};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_program::pubkey::Pubkey;
use solana_sdk::{
    commitment_config::CommitmentConfig, signer::Signer, system_instruction,
    transaction::Transaction,
};
use std::str::FromStr;
use tracing::{info, instrument};

/// Ledger gateway backed by a Solana JSON-RPC endpoint.
pub struct SolanaLedger {
    client: RpcClient,
    rpc_url: String,
}

impl SolanaLedger {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        let rpc_url = rpc_url.into();
        let client = RpcClient::new_with_commitment(rpc_url.clone(), CommitmentConfig::confirmed());
        Self { client, rpc_url }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Balance of `address` in lamports.
    pub async fn balance(&self, address: &str) -> Result<u64, LedgerError> {
        let pubkey = parse_address(address)?;
        self.client
            .get_balance(&pubkey)
            .await
            .map_err(|e| LedgerError::Submission(format!("get_balance failed: {e}")))
    }

    /// Version string reported by the cluster, for connectivity checks.
    pub async fn version(&self) -> Result<String, LedgerError> {
        self.client
            .get_version()
            .await
            .map(|v| v.solana_core)
            .map_err(|e| LedgerError::Submission(format!("get_version failed: {e}")))
    }
}

fn parse_address(address: &str) -> Result<Pubkey, LedgerError> {
    Pubkey::from_str(address).map_err(|e| LedgerError::InvalidRecipient {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl LedgerGateway for SolanaLedger {
    #[instrument(skip_all, fields(recipient = %recipient, amount = amount))]
    async fn transfer(
        &self,
        payer: &Identity,
        recipient: &str,
        amount: u64,
    ) -> Result<String, LedgerError> {
        let to = parse_address(recipient)?;
        let signer = payer.keypair();

        let instruction = system_instruction::transfer(&signer.pubkey(), &to, amount);
        let recent_blockhash = self
            .client
            .get_latest_blockhash()
            .await
            .map_err(|e| LedgerError::Submission(format!("get_latest_blockhash failed: {e}")))?;
        let transaction = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&signer.pubkey()),
            &[signer],
            recent_blockhash,
        );

        let signature = self
            .client
            .send_and_confirm_transaction(&transaction)
            .await
            .map_err(|e| LedgerError::Submission(e.to_string()))?;
        let digest = signature.to_string();

        // Confirmed is not enough if the transaction itself failed.
        match self.client.get_signature_status(&signature).await {
            Ok(Some(Ok(()))) => {}
            Ok(Some(Err(e))) => {
                return Err(LedgerError::Settlement {
                    digest,
                    reason: e.to_string(),
                })
            }
            Ok(None) => {
                return Err(LedgerError::Settlement {
                    digest,
                    reason: "signature status unknown after confirmation".to_string(),
                })
            }
            Err(e) => {
                return Err(LedgerError::Settlement {
                    digest,
                    reason: e.to_string(),
                })
            }
        }

        info!(%digest, "deposit transfer settled");
        Ok(digest)
    }
}
