/// Provider asset code for a catalog network type.
///
/// Unmapped network types yield `None`; the check still goes out with an empty asset
/// and the provider decides.
pub fn asset_code(network_type: &str) -> Option<&'static str> {
    match network_type {
        "trc20" => Some("TRX"),
        "erc20" => Some("ETH"),
        "btc" => Some("BTC"),
        "ltc" => Some("LTC"),
        "bsc" => Some("BSC"),
        _ => None,
    }
}
