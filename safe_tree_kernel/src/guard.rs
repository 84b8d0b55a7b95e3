//! SafeTree v1 - Wiring Guard
//!
//! A registered wallet must keep this module enabled and this guard
//! installed. Wallets run the check after each of their own
//! transactions; `disconnect_safe` is the only sanctioned way out.

use crate::engine::SafeTreeModule;
use crate::error::ModuleError;
use crate::primitives::Address;
use crate::wallet::WalletHost;

impl SafeTreeModule {
    pub fn check_after_execution(
        &self,
        host: &dyn WalletHost,
        wallet: Address,
    ) -> Result<(), ModuleError> {
        if !self.is_safe_registered(wallet) {
            return Ok(());
        }
        let config = self.config();
        if !host.is_module_enabled(wallet, config.module_address) {
            return Err(ModuleError::CannotDisableModule(wallet));
        }
        if host.guard(wallet) != Some(config.guard_address) {
            return Err(ModuleError::CannotDisableGuard(wallet));
        }
        Ok(())
    }
}
