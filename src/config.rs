use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Ausente cuando se opera en modo demo.
    pub database_url: Option<String>,
    pub demo: bool,
    pub demo_dir: PathBuf,
    pub almacen_dir: PathBuf,
    pub jwt_secret: String,
    pub timeout_pedido: Duration,
    pub timeout_detalles: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let demo = env::var("DEMO_MODE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let database_url = env::var("DATABASE_URL").ok();
        if !demo && database_url.is_none() {
            anyhow::bail!("DATABASE_URL es obligatorio fuera de modo demo");
        }
        let demo_dir = env::var("DEMO_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".mercado_demo"));
        let almacen_dir = env::var("ALMACEN_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".mercado_almacen"));
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "demo-secret".to_string());
        let timeout_pedido = duracion_ms("PEDIDO_TIMEOUT_MS", 18_000);
        let timeout_detalles = duracion_ms("DETALLE_TIMEOUT_MS", 10_000);
        Ok(Self {
            database_url,
            demo,
            demo_dir,
            almacen_dir,
            jwt_secret,
            timeout_pedido,
            timeout_detalles,
        })
    }
}

fn duracion_ms(var: &str, por_defecto: u64) -> Duration {
    let ms = env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(por_defecto);
    Duration::from_millis(ms)
}
