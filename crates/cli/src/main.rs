use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use storefront_catalog::{
    open_store, CatalogError, CreateProductRequest, ProductService, PurchaseRequest, StoreConfig,
};
use storefront_server::{ServerConfig, StoreArgs};

#[derive(Parser, Debug)]
#[command(author, version, about = "Storefront CLI - Manage the product catalog", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Read the store section of a server TOML config instead of the flags below
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
    Product {
        #[command(subcommand)]
        command: ProductCommands,
    },
}

#[derive(Subcommand, Debug)]
enum SchemaCommands {
    /// Create the products table and its index if missing
    Init,
}

#[derive(Subcommand, Debug)]
enum ProductCommands {
    List {
        #[arg(long, help = "Print the listing as JSON")]
        json: bool,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: String,
        #[arg(long)]
        description: Option<String>,
    },
    Buy {
        product_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install().map_err(anyhow::Error::msg)?;

    let cli = Cli::parse();

    let store_config = match &cli.config {
        Some(path) => ServerConfig::load(path).await?.store,
        None => cli.store.clone().into_store_config(),
    };

    match &cli.command {
        Commands::Schema { command } => handle_schema_command(command, &store_config).await?,
        Commands::Product { command } => handle_product_command(command, &store_config).await?,
    }

    Ok(())
}

async fn service(config: &StoreConfig) -> Result<ProductService> {
    let store = open_store(config).await?;
    Ok(ProductService::new(store))
}

async fn handle_schema_command(command: &SchemaCommands, config: &StoreConfig) -> Result<()> {
    let service = service(config).await?;

    match command {
        SchemaCommands::Init => match service.initialize().await {
            Ok(()) => println!("Schema ready on {} store", service.backend()),
            Err(e) => fail("Failed to initialize schema", &e),
        },
    }

    Ok(())
}

async fn handle_product_command(command: &ProductCommands, config: &StoreConfig) -> Result<()> {
    let service = service(config).await?;

    match command {
        ProductCommands::List { json } => match service.list().await {
            Ok(products) if *json => println!("{}", serde_json::to_string_pretty(&products)?),
            Ok(products) if products.is_empty() => println!("No products found"),
            Ok(products) => {
                println!("Products:");
                for product in products {
                    let status = if product.available { "available" } else { "sold" };
                    println!(
                        "  #{} {} - {} ({}, added {})",
                        product.id, product.name, product.price, status, product.created_at
                    );
                    if !product.description.is_empty() {
                        println!("      {}", product.description);
                    }
                }
            }
            Err(e) => fail("Failed to list products", &e),
        },
        ProductCommands::Add {
            name,
            price,
            description,
        } => {
            let request = CreateProductRequest {
                name: Some(name.clone()),
                price: Some(Value::String(price.clone())),
                description: description.clone(),
            };

            match service.create(request).await {
                Ok(product) => {
                    println!("Created product:");
                    println!("  ID: {}", product.id);
                    println!("  Name: {}", product.name);
                    println!("  Price: {}", product.price);
                    println!("  Created: {}", product.created_at);
                }
                Err(e) => fail("Failed to create product", &e),
            }
        }
        ProductCommands::Buy { product_id } => {
            let request = PurchaseRequest {
                product_id: Some(Value::String(product_id.clone())),
            };

            match service.purchase(request).await {
                Ok(purchased) => println!("Purchased product #{} ({})", purchased.id, purchased.name),
                Err(e) => fail("Failed to purchase product", &e),
            }
        }
    }

    Ok(())
}

fn fail(context: &str, error: &CatalogError) -> ! {
    eprintln!("{}: {} [{}]", context, error, error.code());
    std::process::exit(1);
}
