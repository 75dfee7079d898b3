use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use uuid::Uuid;

use mercado_express::{config::AppConfig, db::crear_pool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let database_url = config
        .database_url
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL es obligatorio para sembrar"))?;

    let pool = crear_pool(&database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = asegurar_perfil(&pool, "admin@mercado.bo", "admin123", "admin").await?;
    let vendedor_id = asegurar_perfil(&pool, "vendedor@mercado.bo", "vendedor123", "vendedor").await?;
    let comprador_id = asegurar_perfil(&pool, "comprador@mercado.bo", "comprador123", "usuario").await?;
    sembrar_productos(&pool, vendedor_id).await?;

    println!(
        "Siembra completa. Admin: {admin_id}, Vendedor: {vendedor_id}, Comprador: {comprador_id}"
    );
    Ok(())
}

async fn asegurar_perfil(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    rol: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let fila: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO perfiles (id, email, password_hash, nombres, apellidos, rol)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (email) DO UPDATE SET rol = EXCLUDED.rol
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind("Perfil")
    .bind("Semilla")
    .bind(rol)
    .fetch_optional(pool)
    .await?;

    let perfil_id = match fila {
        Some((id,)) => id,
        None => {
            let existente: (Uuid,) = sqlx::query_as("SELECT id FROM perfiles WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existente.0
        }
    };

    println!("Perfil asegurado {email} (rol={rol})");
    Ok(perfil_id)
}

async fn sembrar_productos(pool: &sqlx::PgPool, vendedor_id: Uuid) -> anyhow::Result<()> {
    let productos = vec![
        ("Charango artesanal", "Charango de quirquincho tallado a mano", 45_000_i64, 3),
        ("Aguayo tradicional", "Tejido multicolor de los Andes", 12_000, 25),
        ("Sombrero de chola paceña", "Borsalino original", 80_000, 5),
        ("Mate de coca (caja x50)", "Infusión natural", 2_500, 120),
    ];

    for (nombre, descripcion, precio, stock) in productos {
        sqlx::query(
            r#"
            INSERT INTO productos (id, nombre, descripcion, precio, stock, condicion, vendedor_id)
            VALUES ($1, $2, $3, $4, $5, 'nuevo', $6)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(nombre)
        .bind(descripcion)
        .bind(precio)
        .bind(stock)
        .bind(vendedor_id)
        .execute(pool)
        .await?;
    }

    println!("Productos sembrados");
    Ok(())
}
