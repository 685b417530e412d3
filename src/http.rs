use once_cell::sync::Lazy;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// 全局复用的 HTTP Client（统一连接池/Keep-Alive），按 timeout 维度区分。
///
/// `Client` 内部为 `Arc`，克隆只是增加引用计数。
static CLIENTS: Lazy<Mutex<HashMap<Duration, Client>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// 获取指定超时的共享 HTTP Client，首次调用时构建。
pub fn client_with_timeout(timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut clients = CLIENTS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(client) = clients.get(&timeout) {
        return Ok(client.clone());
    }
    let client = Client::builder().timeout(timeout).build()?;
    clients.insert(timeout, client.clone());
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::{CLIENTS, client_with_timeout};
    use std::time::Duration;

    #[test]
    fn clients_are_memoized_per_timeout() {
        let timeout = Duration::from_millis(7_001);
        client_with_timeout(timeout).expect("client");
        client_with_timeout(timeout).expect("client");
        let clients = CLIENTS.lock().expect("clients lock");
        assert!(clients.contains_key(&timeout));
    }
}
