//! Collaborator trait implementations backed by the Gateway.

use async_trait::async_trait;
use range_keeper_core::{
    ActionExecutor, BurnAndMintRequest, BurnRequest, CollateralOracle, CollateralQuery,
    CollateralReport, KeeperError, MintRequest, PoolMetadata, PoolSession, PositionLeg,
    PositionQuery, PriceFeed, Result, SessionResolver, StraddleSpec, TickLadder, TokenId,
    TokenInfo, TxHandle, TxStatus, U256,
};

use crate::client::GatewayClient;
use crate::types::{
    id_list, BigNumberish, BroadcastResponse, BurnAndMintRequestBody, BurnRequestBody,
    CheckCollateralRequest, CheckCollateralResponse, CheckUniswapPoolRequest,
    CreatePositionResponse, CreateStraddleRequest, MintRequestBody, PanopticPoolRequest,
    PanopticPoolResponse, PollRequest, PollResponse, QueryPositionsResponse, SpotPriceRequest,
    SpotPriceResponse, TickSpacingResponse, TokenAddressRequest, TokenAddressResponse,
    UniswapPoolRequest, UniswapPoolResponse, UnwrapTokenIdRequest, UnwrapTokenIdResponse,
};

pub(crate) mod endpoint {
    pub const TOKEN_ADDRESS: &str = "options/getTokenAddress";
    pub const CHECK_UNISWAP_POOL: &str = "options/checkUniswapPool";
    pub const PANOPTIC_POOL: &str = "options/getPanopticPool";
    pub const TICK_SPACING: &str = "options/getTickSpacingAndInitializedTicks";
    pub const SPOT_PRICE: &str = "options/getSpotPrice";
    pub const QUERY_POSITIONS: &str = "options/queryPositions";
    pub const UNWRAP_TOKEN_ID: &str = "options/unwrapTokenId";
    pub const CREATE_STRADDLE: &str = "options/createStraddle";
    pub const CHECK_COLLATERAL: &str = "options/checkCollateral";
    pub const MINT: &str = "options/mint";
    pub const BURN: &str = "options/burn";
    pub const BURN_AND_MINT: &str = "options/burnAndMint";
    pub const POLL: &str = "network/poll";
}

fn big(endpoint: &str, field: &str, value: &BigNumberish) -> Result<U256> {
    value
        .to_u256()
        .map_err(|e| KeeperError::venue(endpoint, format!("{field}: {e}")))
}

fn require_address(endpoint: &str, field: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(KeeperError::venue(endpoint, format!("{field} is empty")));
    }
    Ok(value)
}

fn tx_handle(endpoint: &str, response: BroadcastResponse) -> Result<TxHandle> {
    match response.tx_hash {
        Some(tx_hash) if !tx_hash.is_empty() => Ok(TxHandle { tx_hash }),
        _ => Err(KeeperError::venue(endpoint, "response carries no txHash")),
    }
}

#[async_trait]
impl SessionResolver for GatewayClient {
    async fn token_info(&self, symbol: &str) -> Result<TokenInfo> {
        let response: TokenAddressResponse = self
            .read(endpoint::TOKEN_ADDRESS, &TokenAddressRequest { token_symbol: symbol })
            .await?;
        Ok(TokenInfo {
            symbol: symbol.to_string(),
            address: require_address(endpoint::TOKEN_ADDRESS, "tokenAddress", response.token_address)?,
            decimals: response.token_decimals,
        })
    }

    async fn uniswap_pool(&self, token0: &TokenInfo, token1: &TokenInfo, fee: u32) -> Result<String> {
        let request = CheckUniswapPoolRequest {
            t0_address: &token0.address,
            t1_address: &token1.address,
            fee,
        };
        let response: UniswapPoolResponse = self.read(endpoint::CHECK_UNISWAP_POOL, &request).await?;
        require_address(
            endpoint::CHECK_UNISWAP_POOL,
            "uniswapV3PoolAddress",
            response.uniswap_pool,
        )
    }

    async fn panoptic_pool(&self, uniswap_pool: &str) -> Result<String> {
        let response: PanopticPoolResponse = self
            .read(endpoint::PANOPTIC_POOL, &UniswapPoolRequest { uniswap_pool })
            .await?;
        require_address(
            endpoint::PANOPTIC_POOL,
            "panopticPoolAddress",
            response.panoptic_pool,
        )
    }
}

#[async_trait]
impl PoolMetadata for GatewayClient {
    async fn tick_spacing_and_ladder(&self, uniswap_pool: &str) -> Result<(i32, TickLadder)> {
        let response: TickSpacingResponse = self
            .read(endpoint::TICK_SPACING, &UniswapPoolRequest { uniswap_pool })
            .await?;
        if response.tick_spacing <= 0 {
            return Err(KeeperError::venue(
                endpoint::TICK_SPACING,
                format!("tickSpacing {} is not positive", response.tick_spacing),
            ));
        }
        let ladder = TickLadder::new(response.ticks)
            .map_err(|e| KeeperError::venue(endpoint::TICK_SPACING, e.to_string()))?;
        Ok((response.tick_spacing, ladder))
    }
}

#[async_trait]
impl PriceFeed for GatewayClient {
    async fn spot_price(&self, session: &PoolSession) -> Result<f64> {
        let request = SpotPriceRequest {
            uniswap_pool: &session.uniswap_pool,
            token0_decimals: session.token0.decimals,
            token1_decimals: session.token1.decimals,
        };
        let response: SpotPriceResponse = self.read(endpoint::SPOT_PRICE, &request).await?;
        Ok(response.spot_price)
    }
}

#[async_trait]
impl PositionQuery for GatewayClient {
    async fn open_positions(&self, panoptic_pool: &str) -> Result<Vec<TokenId>> {
        let response: QueryPositionsResponse = self
            .read(endpoint::QUERY_POSITIONS, &PanopticPoolRequest { panoptic_pool })
            .await?;
        response
            .open_position_id_list
            .iter()
            .map(|id| big(endpoint::QUERY_POSITIONS, "openPositionIdList", id).map(TokenId))
            .collect()
    }

    async fn unwrap_position(&self, token_id: &TokenId) -> Result<Vec<PositionLeg>> {
        let request = UnwrapTokenIdRequest {
            token_id: token_id.0.to_string(),
        };
        let response: UnwrapTokenIdResponse = self.read(endpoint::UNWRAP_TOKEN_ID, &request).await?;
        response
            .legs()
            .map_err(|e| KeeperError::venue(endpoint::UNWRAP_TOKEN_ID, e))
    }
}

#[async_trait]
impl ActionExecutor for GatewayClient {
    async fn create_straddle(&self, spec: &StraddleSpec) -> Result<TokenId> {
        let request = CreateStraddleRequest {
            univ3pool: &spec.uniswap_pool,
            width: spec.width,
            strike: spec.strike,
            asset: spec.asset,
            is_long: u8::from(spec.is_long),
            option_ratio: spec.option_ratio,
            start: spec.start,
        };
        // Pure encoding on the Gateway side, safe to retry.
        let response: CreatePositionResponse = self.read(endpoint::CREATE_STRADDLE, &request).await?;
        big(endpoint::CREATE_STRADDLE, "tokenId", &response.token_id).map(TokenId)
    }

    async fn mint(&self, request: &MintRequest) -> Result<TxHandle> {
        let body = MintRequestBody {
            panoptic_pool: &request.panoptic_pool,
            position_id_list: id_list(&request.position_id_list),
            position_size: request.position_size.to_string(),
            effective_liquidity_limit: request.effective_liquidity_limit.to_string(),
        };
        let response: BroadcastResponse = self.submit(endpoint::MINT, &body).await?;
        tx_handle(endpoint::MINT, response)
    }

    async fn burn(&self, request: &BurnRequest) -> Result<TxHandle> {
        let body = BurnRequestBody {
            panoptic_pool: &request.panoptic_pool,
            burn_token_id: request.burn_token_id.to_string(),
            new_position_id_list: id_list(&request.new_position_id_list),
            tick_limit_low: request.tick_limit_low,
            tick_limit_high: request.tick_limit_high,
        };
        let response: BroadcastResponse = self.submit(endpoint::BURN, &body).await?;
        tx_handle(endpoint::BURN, response)
    }

    async fn burn_and_mint(&self, request: &BurnAndMintRequest) -> Result<TxHandle> {
        let body = BurnAndMintRequestBody {
            panoptic_pool: &request.panoptic_pool,
            burn_token_id: request.burn_token_id.to_string(),
            postburn_position_id_list: id_list(&request.postburn_position_id_list),
            mint_token_id: request.mint_token_id.to_string(),
            position_size: request.position_size.to_string(),
            effective_liquidity_limit: request.effective_liquidity_limit.to_string(),
            burn_tick_limit_low: request.burn_tick_limit_low,
            burn_tick_limit_high: request.burn_tick_limit_high,
            mint_tick_limit_low: request.mint_tick_limit_low,
            mint_tick_limit_high: request.mint_tick_limit_high,
        };
        let response: BroadcastResponse = self.submit(endpoint::BURN_AND_MINT, &body).await?;
        tx_handle(endpoint::BURN_AND_MINT, response)
    }

    async fn transaction_status(&self, handle: &TxHandle) -> Result<TxStatus> {
        let response: PollResponse = self
            .read(endpoint::POLL, &PollRequest { tx_hash: &handle.tx_hash })
            .await?;
        Ok(response.status())
    }
}

#[async_trait]
impl CollateralOracle for GatewayClient {
    async fn check_collateral(&self, query: &CollateralQuery) -> Result<CollateralReport> {
        let request = CheckCollateralRequest {
            panoptic_pool: &query.panoptic_pool,
            at_tick: query.at_tick,
            position_id_list: id_list(&query.position_id_list),
        };
        let response: CheckCollateralResponse =
            self.read(endpoint::CHECK_COLLATERAL, &request).await?;
        let field =
            |name: &str, value: &BigNumberish| big(endpoint::CHECK_COLLATERAL, name, value);
        Ok(CollateralReport {
            balance0: field("collateralBalance0", &response.collateral_balance0)?,
            balance1: field("collateralBalance1", &response.collateral_balance1)?,
            required0: field("requiredCollateral0", &response.required_collateral0)?,
            required1: field("requiredCollateral1", &response.required_collateral1)?,
        })
    }
}
