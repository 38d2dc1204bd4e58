use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alloy::primitives::{address, Address, U256};
use alloy::providers::RootProvider;
use alloy::sol;
use async_trait::async_trait;
use lottery_config::converters::{
    deserialize_milliseconds_to_duration,
    deserialize_vec_url,
    serialize_duration_as_milliseconds,
    serialize_slice_url,
    serialize_vec_url,
};
use lottery_config::dumping::{ser_param, SerializeConfig};
use lottery_config::{ParamPath, ParamPrivacyInput, SerializedParam};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;
use validator::Validate;

use crate::errors::classify_contract_error;
use crate::metrics::{record_error, register_metrics, LOTTERY_CONTRACT_REQUESTS_TOTAL};
use crate::{
    ChainCallError,
    ChainCallResult,
    ContractFunction,
    LotteryContractReader,
    RoundId,
    RoundInfo,
    TicketNumber,
};

#[cfg(test)]
#[path = "ethereum_lottery_contract_test.rs"]
mod ethereum_lottery_contract_test;

// The view functions of the deployed lottery contract that this crate reads.
sol! {
    #[sol(rpc)]
    interface ILottery {
        function getTicketRank(uint256 roundId, uint256 ticketNumber) external view returns (uint8);
        function getTicketOwner(uint256 roundId, uint256 ticketNumber) external view returns (address);
        function calculateTicketPrize(uint256 roundId, uint256 ticketNumber) external view returns (uint256);
        function currentRoundId() external view returns (uint256);
        function getRoundInfo(uint256 roundId) external view returns (
            uint256 totalTickets,
            uint256 ticketPrice,
            uint256 ticketsSold,
            bool isActive,
            bool drawExecuted,
            bool settled,
            uint256 createdAt
        );
        function isClaimed(address user, uint256 roundId) external view returns (bool);
        function getUserTickets(uint256 roundId, address user) external view returns (uint256[] memory);
    }
}

type LotteryInstance = ILottery::ILotteryInstance<RootProvider>;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
pub struct EthereumLotteryContractConfig {
    /// Tried in order, starting from the last endpoint that answered successfully.
    #[serde(deserialize_with = "deserialize_vec_url", serialize_with = "serialize_vec_url")]
    #[validate(length(min = 1))]
    pub node_urls: Vec<Url>,
    pub lottery_contract_address: Address,
    #[serde(
        deserialize_with = "deserialize_milliseconds_to_duration",
        serialize_with = "serialize_duration_as_milliseconds"
    )]
    pub call_timeout: Duration,
}

impl SerializeConfig for EthereumLotteryContractConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from_iter([
            ser_param(
                "node_urls",
                &serialize_slice_url(&self.node_urls),
                "Space separated JSON-RPC node URLs. If one fails, the next one is tried.",
                ParamPrivacyInput::Private,
            ),
            ser_param(
                "lottery_contract_address",
                &self.lottery_contract_address.to_string(),
                "Address of the lottery contract.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "call_timeout",
                &self.call_timeout.as_millis(),
                "Timeout (milliseconds) of a single view call to a single node.",
                ParamPrivacyInput::Public,
            ),
        ])
    }
}

impl Default for EthereumLotteryContractConfig {
    fn default() -> Self {
        let node_urls = [
            "https://polygon-rpc.com",
            "https://rpc-mainnet.maticvigil.com",
            "https://rpc-mainnet.matic.network",
            "https://polygon.llamarpc.com",
        ]
        .into_iter()
        .map(|url| Url::parse(url).expect("Invalid URL"))
        .collect();

        Self {
            node_urls,
            lottery_contract_address: address!("DaeD50C7eE02406b6017b4ABE5E413b08D819647"),
            call_timeout: Duration::from_secs(10),
        }
    }
}

/// Reads the lottery contract through one or more JSON-RPC nodes.
pub struct EthereumLotteryContract {
    config: EthereumLotteryContractConfig,
    contracts: Vec<(Url, LotteryInstance)>,
    /// The index of the node that answered last. Calls start from it and cycle through the rest.
    index: AtomicUsize,
}

impl EthereumLotteryContract {
    pub fn new(config: EthereumLotteryContractConfig) -> Self {
        info!(
            "Creating EthereumLotteryContract for {} with {} node URLs",
            config.lottery_contract_address,
            config.node_urls.len()
        );
        register_metrics();
        let contracts = config
            .node_urls
            .iter()
            .map(|url| {
                let provider = RootProvider::new_http(url.clone());
                (url.clone(), ILottery::new(config.lottery_contract_address, provider))
            })
            .collect();
        Self { config, contracts, index: AtomicUsize::new(0) }
    }

    pub fn config(&self) -> &EthereumLotteryContractConfig {
        &self.config
    }

    async fn call_with_failover<T, F, Fut>(
        &self,
        function: ContractFunction,
        call: F,
    ) -> ChainCallResult<T>
    where
        F: Fn(LotteryInstance) -> Fut,
        Fut: Future<Output = Result<T, alloy::contract::Error>>,
    {
        let list_len = self.contracts.len();
        let initial_index = self.index.load(Ordering::SeqCst);
        let mut last_error = None;

        for (i, (url, contract)) in
            self.contracts.iter().cycle().skip(initial_index).take(list_len).enumerate()
        {
            LOTTERY_CONTRACT_REQUESTS_TOTAL.increment(1);
            let error =
                match tokio::time::timeout(self.config.call_timeout, call(contract.clone())).await {
                    Ok(Ok(value)) => {
                        self.index.store((initial_index + i) % list_len, Ordering::SeqCst);
                        return Ok(value);
                    }
                    Ok(Err(error)) => classify_contract_error(function, error),
                    Err(_) => ChainCallError::Transient {
                        function,
                        message: format!("timed out after {:?}", self.config.call_timeout),
                    },
                };
            record_error(error.kind());
            warn!("Call to {function} via {url} failed: {error}");
            last_error = Some(error);
        }

        Err(last_error.unwrap_or_else(|| ChainCallError::Transient {
            function,
            message: "no node URLs configured".to_owned(),
        }))
    }
}

fn u256_to_u64(function: ContractFunction, value: U256) -> ChainCallResult<u64> {
    u64::try_from(value).map_err(|_| ChainCallError::Permanent {
        function,
        message: format!("value {value} does not fit in u64"),
    })
}

#[async_trait]
impl LotteryContractReader for EthereumLotteryContract {
    #[instrument(skip(self), level = "trace")]
    async fn ticket_rank(
        &self,
        round_id: RoundId,
        ticket_number: TicketNumber,
    ) -> ChainCallResult<u8> {
        let (round, ticket) = (U256::from(round_id), U256::from(ticket_number));
        self.call_with_failover(ContractFunction::GetTicketRank, |contract| async move {
            contract.getTicketRank(round, ticket).call().await
        })
        .await
    }

    #[instrument(skip(self), level = "trace")]
    async fn ticket_owner(
        &self,
        round_id: RoundId,
        ticket_number: TicketNumber,
    ) -> ChainCallResult<Address> {
        let (round, ticket) = (U256::from(round_id), U256::from(ticket_number));
        self.call_with_failover(ContractFunction::GetTicketOwner, |contract| async move {
            contract.getTicketOwner(round, ticket).call().await
        })
        .await
    }

    #[instrument(skip(self), level = "trace")]
    async fn ticket_prize(
        &self,
        round_id: RoundId,
        ticket_number: TicketNumber,
    ) -> ChainCallResult<U256> {
        let (round, ticket) = (U256::from(round_id), U256::from(ticket_number));
        self.call_with_failover(ContractFunction::CalculateTicketPrize, |contract| async move {
            contract.calculateTicketPrize(round, ticket).call().await
        })
        .await
    }

    async fn current_round_id(&self) -> ChainCallResult<RoundId> {
        let function = ContractFunction::CurrentRoundId;
        let round_id = self
            .call_with_failover(function, |contract| async move {
                contract.currentRoundId().call().await
            })
            .await?;
        u256_to_u64(function, round_id)
    }

    #[instrument(skip(self), level = "trace")]
    async fn round_info(&self, round_id: RoundId) -> ChainCallResult<RoundInfo> {
        let function = ContractFunction::GetRoundInfo;
        let round = U256::from(round_id);
        let info = self
            .call_with_failover(function, |contract| async move {
                contract.getRoundInfo(round).call().await
            })
            .await?;
        debug!("Round {round_id} has sold {} of {} tickets", info.ticketsSold, info.totalTickets);
        Ok(RoundInfo {
            total_tickets: u256_to_u64(function, info.totalTickets)?,
            ticket_price: info.ticketPrice,
            tickets_sold: u256_to_u64(function, info.ticketsSold)?,
            is_active: info.isActive,
            draw_executed: info.drawExecuted,
            settled: info.settled,
            created_at: u256_to_u64(function, info.createdAt)?,
        })
    }

    async fn is_claimed(&self, account: Address, round_id: RoundId) -> ChainCallResult<bool> {
        let round = U256::from(round_id);
        self.call_with_failover(ContractFunction::IsClaimed, |contract| async move {
            contract.isClaimed(account, round).call().await
        })
        .await
    }

    async fn user_tickets(
        &self,
        round_id: RoundId,
        account: Address,
    ) -> ChainCallResult<Vec<TicketNumber>> {
        let function = ContractFunction::GetUserTickets;
        let round = U256::from(round_id);
        let tickets = self
            .call_with_failover(function, |contract| async move {
                contract.getUserTickets(round, account).call().await
            })
            .await?;
        tickets.into_iter().map(|ticket| u256_to_u64(function, ticket)).collect()
    }
}
