use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use models::{BalanceSnapshot, ManualEntry, MANUAL_ENTRY_BANK_CODE, MANUAL_ENTRY_FILE};
use reconciliation_store::{InsertOutcome, JsonFileStore, ReconciliationStore};
use return_parser::{detect_format, parse_return};

#[derive(Parser)]
#[command(name = "conciliador", about = "Ingestão e conciliação de arquivos de retorno bancário")]
struct Cli {
    /// Caminho do arquivo de banco de dados JSON.
    #[arg(long, default_value = "database/conciliacao.json", global = true)]
    database: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Identifica o formato físico de um arquivo de retorno.
    Detectar { arquivo: PathBuf },
    /// Processa um arquivo e imprime registros e resumo, sem persistir.
    Processar {
        arquivo: PathBuf,
        /// Tag da instituição emissora (ex.: sicredi, sicoob).
        #[arg(long)]
        banco: String,
    },
    /// Processa e persiste um arquivo, rejeitando duplicados.
    Ingerir {
        arquivo: PathBuf,
        #[arg(long)]
        banco: String,
    },
    /// Imprime o saldo atual derivado de cada conta.
    Saldos,
    /// Lança manualmente um saldo de conta.
    Lancar {
        #[arg(long)]
        banco_nome: String,
        #[arg(long)]
        agencia: String,
        #[arg(long)]
        conta: String,
        #[arg(long)]
        valor: f64,
        /// "+" ou "-", direção do ajuste.
        #[arg(long, default_value = "+")]
        operacao: String,
        #[arg(long, default_value = "")]
        descricao: String,
        /// Usuário responsável pelo lançamento.
        #[arg(long)]
        usuario: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Detectar { arquivo } => {
            let bytes = std::fs::read(&arquivo)
                .with_context(|| format!("Falha ao ler {}", arquivo.display()))?;
            println!("{:?}", detect_format(&bytes)?);
        }
        Command::Processar { arquivo, banco } => {
            let bytes = std::fs::read(&arquivo)
                .with_context(|| format!("Falha ao ler {}", arquivo.display()))?;
            match parse_return(&bytes, &banco) {
                Ok(parsed) => println!("{}", serde_json::to_string_pretty(&parsed)?),
                Err(e) => {
                    // Falha estrutural: nenhuma lista parcial de registros.
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&serde_json::json!({
                            "banco": banco,
                            "erro": e.to_string(),
                        }))?
                    );
                    std::process::exit(1);
                }
            }
        }
        Command::Ingerir { arquivo, banco } => {
            let bytes = std::fs::read(&arquivo)
                .with_context(|| format!("Falha ao ler {}", arquivo.display()))?;
            let parsed = parse_return(&bytes, &banco)?;

            let mut store = ReconciliationStore::new(JsonFileStore::open(&cli.database)?);
            match store.ingest_return_file(&bytes, &parsed.registros) {
                InsertOutcome::Inserted => {
                    tracing::info!(
                        registros = parsed.resumo.total_registros,
                        classificacao = %parsed.classificacao,
                        "arquivo ingerido"
                    );
                    println!("{}", serde_json::to_string_pretty(&parsed.resumo)?);
                }
                InsertOutcome::Duplicate => {
                    println!("Arquivo já ingerido anteriormente (duplicado); nada persistido.");
                }
                InsertOutcome::Failed(reason) => {
                    anyhow::bail!("Falha ao persistir: {reason}");
                }
            }
        }
        Command::Saldos => {
            let store = ReconciliationStore::new(JsonFileStore::open(&cli.database)?);
            let atuais = balance::current_balances(store.snapshots()?);
            println!("{}", serde_json::to_string_pretty(&atuais)?);
        }
        Command::Lancar {
            banco_nome,
            agencia,
            conta,
            valor,
            operacao,
            descricao,
            usuario,
        } => {
            let agora = Local::now().naive_local();
            let snapshot = BalanceSnapshot {
                nome_arquivo: MANUAL_ENTRY_FILE.to_string(),
                dt_upload: agora,
                valor,
                banco_nome,
                banco_codigo: MANUAL_ENTRY_BANK_CODE.to_string(),
                layout: "manual".to_string(),
                agencia,
                conta,
                valor_formatado: format!("R$ {:.2}", valor),
                dt_geracao: agora,
                dt_processamento: agora,
                dt_criacao: agora,
                lancamento_manual: Some(ManualEntry {
                    operacao,
                    descricao,
                    usuario,
                }),
                limite_cheque_especial: None,
            };

            let mut store = ReconciliationStore::new(JsonFileStore::open(&cli.database)?);
            match store.insert_snapshot(snapshot) {
                InsertOutcome::Inserted => println!("Lançamento registrado."),
                InsertOutcome::Duplicate => println!("Lançamento idêntico já registrado."),
                InsertOutcome::Failed(reason) => anyhow::bail!("Falha ao persistir: {reason}"),
            }
        }
    }

    Ok(())
}
