use alloy::{
    network::Ethereum,
    primitives::{Address, Bytes},
    providers::Provider,
};
use anyhow::Result;

use crate::contracts::Multicall3::{self, Call3, Multicall3Instance};

const MULTICALL_ADDRESS: &str = "0xcA11bde05977b3631167028862bE2a173976CA11";

pub struct MulticallManager<P: Provider<Ethereum>> {
    multicall_contract: Multicall3Instance<(), P>,
    calls: Vec<Call3>,
}

impl<P: Provider<Ethereum>> MulticallManager<P> {
    pub fn new(provider: P) -> Result<Self> {
        let multicall = Multicall3::new(MULTICALL_ADDRESS.parse::<Address>()?, provider);

        Ok(Self {
            multicall_contract: multicall,
            calls: vec![],
        })
    }

    // allowFailure is false on purpose: one failed sub-call reverts the
    // whole batch, and the caller treats the fetch as failed in full.
    pub fn add_call(&mut self, target: &Address, call_data: &Bytes) {
        self.calls.push(Call3 {
            target: *target,
            callData: call_data.clone(),
            allowFailure: false,
        });
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn get_calls(&self) -> &Vec<Call3> {
        &self.calls
    }

    pub async fn execute_calls(&self) -> Result<Vec<Bytes>> {
        let multicall_result = self
            .multicall_contract
            .aggregate3(self.calls.clone())
            .call()
            .await?;
        let mut results = vec![];

        for i in 0..multicall_result.returnData.len() {
            results.push(multicall_result.returnData[i].returnData.clone());
        }

        Ok(results)
    }
}
