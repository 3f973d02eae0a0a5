/*
 * amnesia: seal a secret behind a set of security questions
 * Copyright (C) 2018-2022 Aleksa Sarai <cyphar@cyphar.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::{
    error::Error as StdError,
    fs::{File, OpenOptions},
    io,
    io::{prelude::*, BufReader},
};

use anyhow::{anyhow, ensure, Context, Error};
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

extern crate amnesia_core;
use amnesia_core::{Answers, Envelope, Question, Questions, MIN_QUESTIONS};

fn read_input(path: &str) -> Result<Zeroizing<Vec<u8>>, Error> {
    let (mut stdin_reader, mut file_reader);
    let input: &mut dyn Read = if path == "-" {
        stdin_reader = io::stdin();
        &mut stdin_reader
    } else {
        file_reader =
            File::open(path).with_context(|| format!("failed to open input file '{}'", path))?;
        &mut file_reader
    };

    let mut data = Zeroizing::new(Vec::new());
    BufReader::new(input)
        .read_to_end(&mut data)
        .with_context(|| format!("failed to read data from '{}'", path))?;
    Ok(data)
}

fn write_output(path: &str, data: &[u8]) -> Result<(), Error> {
    let (mut stdout_writer, mut file_writer);
    let output: &mut dyn Write = if path == "-" {
        stdout_writer = io::stdout();
        &mut stdout_writer
    } else {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        file_writer = options
            .open(path)
            .with_context(|| format!("failed to open output file '{}' for writing", path))?;
        &mut file_writer
    };

    output
        .write_all(data)
        .and_then(|_| output.flush())
        .with_context(|| format!("failed to write data to '{}'", path))
}

fn prompt_answer(question: &str) -> Result<Zeroizing<String>, Error> {
    rpassword::prompt_password(format!("{}: ", question))
        .map(Zeroizing::new)
        .context("failed to read answer")
}

/// Ask every question in the sealed secret. Questions the user doesn't know
/// the answer to can be left blank.
fn prompt_answers(envelope: &Envelope) -> Result<Answers, Error> {
    let questions = envelope.questions();
    eprintln!(
        "Answer the following {} questions (leave blank to skip).",
        questions.len()
    );

    let mut answers = Answers::new();
    for (id, question) in questions {
        let answer = prompt_answer(question)?;
        answers.set(id, answer.as_str());
    }
    Ok(answers)
}

fn input_arg() -> Arg {
    Arg::new("INPUT")
        .help(r#"Path to file containing the secret data ("-" to read from stdin)."#)
        .action(ArgAction::Set)
        .allow_hyphen_values(true)
        .default_value("-")
        .index(1)
}

fn file_arg() -> Arg {
    Arg::new("file")
        .short('f')
        .long("file")
        .value_name("SEALED FILE")
        .help(r#"Path to the sealed secret ("-" to read from stdin)."#)
        .action(ArgAction::Set)
        .allow_hyphen_values(true)
}

fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("OUTPUT")
        .help(r#"Path to write to ("-" to write to stdout)."#)
        .action(ArgAction::Set)
        .allow_hyphen_values(true)
        .default_value("-")
}

// amnesia seal -t <THRESHOLD> -q <QUESTION>... [--confirm] [-o <OUTPUT>] [INPUT]
fn seal_cli() -> Command {
    Command::new("seal")
        .about(r#"Seal a secret behind a set of security questions."#)
        .long_about(r#"Seal a secret behind a set of security questions. The answer to each question is asked for without echo, and any THRESHOLD of the answers will be required to unseal the secret again. The answers are never stored."#)
        .arg(Arg::new("threshold")
            .short('t')
            .long("threshold")
            .value_name("THRESHOLD")
            .help("Number of correct answers required to unseal the secret (must not be larger than the number of questions).")
            .value_parser(clap::value_parser!(usize))
            .action(ArgAction::Set)
            .required(true))
        .arg(Arg::new("question")
            .short('q')
            .long("question")
            .value_name("QUESTION")
            .help("Question to seal the secret behind (can be given multiple times, at least twice).")
            .action(ArgAction::Append)
            .required(true))
        .arg(Arg::new("confirm")
            .long("confirm")
            .help("Ask for every answer twice to make sure it was entered correctly.")
            .action(ArgAction::SetTrue))
        .arg(output_arg())
        .arg(input_arg())
}

fn seal(matches: &ArgMatches) -> Result<(), Error> {
    let threshold = *matches
        .get_one::<usize>("threshold")
        .context("required --threshold argument not provided")?;
    let confirm = matches.get_flag("confirm");
    let input_path = matches
        .get_one::<String>("INPUT")
        .context("INPUT argument not provided")?;
    let output_path = matches
        .get_one::<String>("output")
        .context("--output argument not provided")?;

    let mut questions = Questions::new();
    for question in matches
        .get_many::<String>("question")
        .context("required --question arguments not provided")?
    {
        ensure!(!question.is_empty(), "questions must not be empty");
        ensure!(
            !questions.contains_question(question),
            "question '{}' was given more than once",
            question
        );

        let answer = loop {
            let answer = prompt_answer(question)?;
            if answer.is_empty() {
                eprintln!("The answer must not be empty.");
                continue;
            }
            if confirm && *prompt_answer(&format!("{} (again)", question))? != *answer {
                eprintln!("The answers did not match.");
                continue;
            }
            break answer;
        };
        questions.push(Question::new(question.as_str(), answer.as_str()));
    }
    ensure!(
        questions.len() >= MIN_QUESTIONS,
        "at least {} questions are required",
        MIN_QUESTIONS
    );

    let secret = read_input(input_path)?;
    info!(questions = questions.len(), threshold, "sealing secret");
    let sealed = amnesia_core::seal(&*secret, &questions, threshold).context("sealing secret")?;

    write_output(output_path, &sealed)
}

// amnesia unseal [-f <SEALED FILE>] [-o <OUTPUT>]
fn unseal_cli() -> Command {
    Command::new("unseal")
        .about(r#"Unseal a secret by answering its security questions."#)
        .arg(file_arg().default_value("-"))
        .arg(output_arg())
}

fn unseal(matches: &ArgMatches) -> Result<(), Error> {
    let sealed_path = matches
        .get_one::<String>("file")
        .context("--file argument not provided")?;
    let output_path = matches
        .get_one::<String>("output")
        .context("--output argument not provided")?;

    let sealed = read_input(sealed_path)?;
    let envelope = amnesia_core::decode(&*sealed).context("reading sealed secret")?;
    debug!(id = envelope.id().as_str(), "decoded sealed secret");

    let answers = prompt_answers(&envelope)?;
    let secret = amnesia_core::unseal(&*sealed, &answers)
        .map(Zeroizing::new)
        .context("unsealing secret")?;

    write_output(output_path, &secret)
}

// amnesia reseal -f <SEALED FILE> [-o <OUTPUT>] [INPUT]
fn reseal_cli() -> Command {
    Command::new("reseal")
        .about(r#"Replace the secret in a sealed file, keeping its security questions."#)
        .long_about(r#"Replace the secret in a sealed file, keeping its security questions. The existing questions must be answered to recover the key, and the new secret is then sealed with that same key. The questions, their answers and the threshold cannot be changed this way."#)
        .arg(file_arg().required(true))
        .arg(output_arg())
        .arg(input_arg())
}

fn reseal(matches: &ArgMatches) -> Result<(), Error> {
    let sealed_path = matches
        .get_one::<String>("file")
        .context("required --file argument not provided")?;
    let input_path = matches
        .get_one::<String>("INPUT")
        .context("INPUT argument not provided")?;
    let output_path = matches
        .get_one::<String>("output")
        .context("--output argument not provided")?;
    ensure!(
        !(sealed_path == "-" && input_path == "-"),
        "the sealed file and the new secret cannot both be read from stdin"
    );

    let sealed = read_input(sealed_path)?;
    let envelope = amnesia_core::decode(&*sealed).context("reading sealed secret")?;
    let answers = prompt_answers(&envelope)?;
    let key = amnesia_core::recover_key(&*sealed, &answers).context("recovering key")?;

    let secret = read_input(input_path)?;
    let resealed =
        amnesia_core::reseal_with_key(&*sealed, &*secret, &key).context("resealing secret")?;
    info!(id = envelope.id().as_str(), "resealed secret");

    write_output(output_path, &resealed)
}

// amnesia inspect [-f <SEALED FILE>]
fn inspect_cli() -> Command {
    Command::new("inspect")
        .about(r#"Show the questions and metadata of a sealed file, without unsealing it."#)
        .arg(file_arg().default_value("-"))
}

fn inspect(matches: &ArgMatches) -> Result<(), Error> {
    let sealed_path = matches
        .get_one::<String>("file")
        .context("--file argument not provided")?;

    let sealed = read_input(sealed_path)?;
    let envelope = amnesia_core::decode(&*sealed).context("reading sealed secret")?;

    println!("ID: {}", envelope.id());
    println!("Version: {}", envelope.version());
    println!("Sealed: {}", envelope.sealed_timestamp());
    println!("Questions:");
    for (id, question) in envelope.questions() {
        println!("  [{}] {}", id, question);
    }
    Ok(())
}

fn cli() -> Command {
    Command::new("amnesia")
        .version("0.0.0")
        .author("Aleksa Sarai <cyphar@cyphar.com>")
        .about("Seal a secret behind a set of security questions.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log debugging information to stderr (overrides RUST_LOG).")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        // amnesia seal -t <THRESHOLD> -q <QUESTION>... [--confirm] [-o <OUTPUT>] [INPUT]
        .subcommand(seal_cli())
        // amnesia unseal [-f <SEALED FILE>] [-o <OUTPUT>]
        .subcommand(unseal_cli())
        // amnesia reseal -f <SEALED FILE> [-o <OUTPUT>] [INPUT]
        .subcommand(reseal_cli())
        // amnesia inspect [-f <SEALED FILE>]
        .subcommand(inspect_cli())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn StdError>> {
    let mut app = cli();
    let matches = app.get_matches_mut();
    init_tracing(matches.get_flag("verbose"));

    let ret = match matches.subcommand() {
        Some(("seal", sub_matches)) => seal(sub_matches),
        Some(("unseal", sub_matches)) => unseal(sub_matches),
        Some(("reseal", sub_matches)) => reseal(sub_matches),
        Some(("inspect", sub_matches)) => inspect(sub_matches),
        Some((subcommand, _)) => {
            // We should never end up here.
            app.print_help()?;
            Err(anyhow!("unknown subcommand '{}'", subcommand))
        }
        None => {
            app.print_help()?;
            Err(anyhow!("no subcommand specified"))
        }
    }?;

    Ok(ret)
}

#[test]
fn verify_cli() {
    cli().debug_assert();
}

#[test]
fn parse_seal_args() {
    let matches = cli()
        .try_get_matches_from([
            "amnesia", "seal", "-t", "2", "-q", "favourite animal", "-q", "favourite food",
        ])
        .unwrap();
    let (name, matches) = matches.subcommand().unwrap();
    assert_eq!(name, "seal");
    assert_eq!(matches.get_one::<usize>("threshold"), Some(&2));
    assert_eq!(
        matches
            .get_many::<String>("question")
            .unwrap()
            .collect::<Vec<_>>(),
        vec!["favourite animal", "favourite food"]
    );
    assert_eq!(matches.get_one::<String>("INPUT").unwrap(), "-");
    assert_eq!(matches.get_one::<String>("output").unwrap(), "-");
}

#[test]
fn parse_reseal_requires_file() {
    assert!(cli().try_get_matches_from(["amnesia", "reseal"]).is_err());
    assert!(cli()
        .try_get_matches_from(["amnesia", "reseal", "-f", "sealed.json", "new.txt"])
        .is_ok());
}

#[test]
fn verbose_is_global() {
    let matches = cli()
        .try_get_matches_from(["amnesia", "inspect", "-f", "sealed.json", "--verbose"])
        .unwrap();
    assert!(matches.get_flag("verbose"));
}
