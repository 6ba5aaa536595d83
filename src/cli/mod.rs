use std::{path::PathBuf, sync::Arc};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::{
    error::{CoreError, EntityKind},
    groups::{GroupId, LeaveOutcome},
    identities::{NewFriendData, ProfileUpdate, UserId},
    ledger::{
        domain::{
            activity::ActivityKind,
            balance::{balance_summary, group_balance},
            bills::{BillId, BillStatus, NewExpenseData},
            money::Money,
        },
        settlement::SettlementOutcome,
    },
    messaging::{ConversationId, MessageBody, Sender},
    payments::{DynPaymentGateway, MockStripeGateway},
    session::Session,
    storage::{DynStorageGateway, JsonFileStore},
};

#[derive(Parser)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// Path of the JSON file holding the ledger.
    #[clap(
        long = "store",
        env = "SPLITLEDGER_STORE",
        default_value = "splitledger.json"
    )]
    store: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what you are owed and what you owe.
    Balances(BalancesOpts),
    /// List every bill on the ledger.
    Bills,
    /// Record a new shared expense.
    AddExpense(AddExpenseOpts),
    /// Pay a bill and mark it settled.
    Settle(SettleOpts),
    /// Manage groups and their members.
    #[clap(subcommand)]
    Groups(GroupsCommand),
    /// Manage the friend directory.
    #[clap(subcommand)]
    Friends(FriendsCommand),
    /// Read and send messages.
    #[clap(subcommand)]
    Chat(ChatCommand),
    /// Show the activity feed, newest first.
    Activities,
    /// Inspect or change the local profile.
    #[clap(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Args)]
struct BalancesOpts {
    /// Break the balance down per member of this group instead of
    /// summarizing your own position.
    #[clap(long = "group")]
    group: Option<String>,
}

#[derive(Args)]
struct AddExpenseOpts {
    /// Conversation the expense belongs to.
    #[clap(long = "conversation")]
    conversation: String,

    /// What the money was spent on.
    #[clap(long = "description")]
    description: String,

    /// Amount that was paid, such as "189.25".
    #[clap(long = "amount")]
    amount: String,

    /// Spending category.
    #[clap(long = "category", default_value = "general")]
    category: String,

    /// Who fronted the money. Defaults to you.
    #[clap(long = "paid-by")]
    paid_by: Option<String>,

    /// Who owes a share, one flag per user. Defaults to the other
    /// members of the group the conversation belongs to.
    #[clap(long = "owed-by")]
    owed_by: Vec<String>,
}

#[derive(Args)]
struct SettleOpts {
    /// Id of the bill to pay.
    bill: String,
}

#[derive(Subcommand)]
enum GroupsCommand {
    /// List every group.
    List,
    /// Show one group's members and balances.
    Show(GroupOpts),
    /// Create a group with you as its first member and admin.
    Create(CreateGroupOpts),
    /// Rename a group.
    Rename(RenameGroupOpts),
    /// Add members to a group.
    AddMembers(GroupMembersOpts),
    /// Remove a member from a group.
    RemoveMember(GroupMemberOpts),
    /// Grant or revoke a member's admin role.
    ToggleAdmin(GroupMemberOpts),
    /// Leave a group.
    Leave(GroupOpts),
    /// Delete a group and its conversation.
    Delete(GroupOpts),
}

#[derive(Args)]
struct GroupOpts {
    /// Id of the group.
    group: String,
}

#[derive(Args)]
struct CreateGroupOpts {
    /// Name of the new group.
    name: String,

    /// Optional description.
    #[clap(long = "description")]
    description: Option<String>,

    /// Friends to invite, one flag per user.
    #[clap(long = "member")]
    members: Vec<String>,
}

#[derive(Args)]
struct RenameGroupOpts {
    /// Id of the group.
    group: String,

    /// The new name.
    name: String,
}

#[derive(Args)]
struct GroupMembersOpts {
    /// Id of the group.
    group: String,

    /// Users to add, one per argument.
    users: Vec<String>,
}

#[derive(Args)]
struct GroupMemberOpts {
    /// Id of the group.
    group: String,

    /// Id of the member.
    user: String,
}

#[derive(Subcommand)]
enum FriendsCommand {
    /// List every friend.
    List,
    /// Add a friend to the directory.
    Add(AddFriendOpts),
    /// Remove a friend from the directory.
    Remove(FriendOpts),
}

#[derive(Args)]
struct AddFriendOpts {
    /// The friend's display name.
    #[clap(long = "name")]
    name: String,

    /// The friend's email address.
    #[clap(long = "email")]
    email: String,

    /// Optional phone number.
    #[clap(long = "phone")]
    phone: Option<String>,
}

#[derive(Args)]
struct FriendOpts {
    /// Id of the friend.
    friend: String,
}

#[derive(Subcommand)]
enum ChatCommand {
    /// Send a text message to a conversation.
    Send(SendMessageOpts),
    /// Print a conversation's messages, oldest first.
    History(ConversationOpts),
    /// Open (or find) the direct conversation with a friend.
    Direct(FriendOpts),
}

#[derive(Args)]
struct SendMessageOpts {
    /// Id of the conversation.
    conversation: String,

    /// The message text.
    text: String,
}

#[derive(Args)]
struct ConversationOpts {
    /// Id of the conversation.
    conversation: String,
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// Show the local profile.
    Show,
    /// Change parts of the local profile.
    Update(UpdateProfileOpts),
    /// Reset the local profile to the default identity.
    Logout,
}

#[derive(Args)]
struct UpdateProfileOpts {
    /// New display name.
    #[clap(long = "name")]
    name: Option<String>,

    /// New email address.
    #[clap(long = "email")]
    email: Option<String>,

    /// New avatar URL.
    #[clap(long = "avatar")]
    avatar: Option<String>,
}

pub async fn run_with_sys_args() -> anyhow::Result<()> {
    use tracing_subscriber::prelude::*;

    let cli = Cli::parse();

    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());

    tracing_subscriber::registry().with(fmt_layer).init();

    let storage: DynStorageGateway = Arc::new(JsonFileStore::new(cli.store));
    let mut session = Session::init(storage).await?;

    match cli.command {
        Commands::Balances(opts) => balances(&session, opts)?,
        Commands::Bills => bills(&session),
        Commands::AddExpense(opts) => add_expense(&mut session, opts).await?,
        Commands::Settle(opts) => settle(&mut session, opts).await?,
        Commands::Groups(command) => groups(&mut session, command).await?,
        Commands::Friends(command) => friends(&mut session, command).await?,
        Commands::Chat(command) => chat(&mut session, command).await?,
        Commands::Activities => activities(&session),
        Commands::Profile(command) => profile(&mut session, command).await?,
    }

    session.teardown().await?;

    Ok(())
}

fn balances(session: &Session, opts: BalancesOpts) -> anyhow::Result<()> {
    let group = match opts.group {
        Some(group) => group,
        None => {
            overall_balances(session);
            return Ok(());
        }
    };

    let group_id = GroupId::new(group);
    let group = session
        .group(&group_id)
        .ok_or_else(|| CoreError::not_found(EntityKind::Group, &group_id))?;
    let conversation = ConversationId::for_group(&group_id);

    println!(
        "{} - total expenses {}",
        group.name,
        group.total_expenses.format_dollars()
    );

    for member in &group.members {
        let balance = group_balance(session.bills(), &conversation, member);
        let name = session.resolve_user(member).display_name().to_owned();
        let net = balance.paid - balance.owed;

        if net.is_positive() {
            println!("  {} gets back {}", name, net.format_dollars());
        } else if (Money::ZERO - net).is_positive() {
            println!("  {} owes {}", name, (Money::ZERO - net).format_dollars());
        } else {
            println!("  {} is settled up", name);
        }
    }

    Ok(())
}

fn overall_balances(session: &Session) {
    let user = &session.user().id;
    let summary = balance_summary(session.bills(), user);

    println!("You are owed {}", summary.total_owed.format_dollars());
    println!("You owe      {}", summary.total_owing.format_dollars());
    println!("Net          {}", summary.net().format_dollars());

    for group in session.groups() {
        let conversation = ConversationId::for_group(&group.id);
        let balance = group_balance(session.bills(), &conversation, user);
        let net = balance.paid - balance.owed;

        if net != Money::ZERO {
            println!("  [{}] {}: {}", group.id, group.name, net.format_dollars());
        }
    }
}

fn bills(session: &Session) {
    for bill in session.bills() {
        let payer = session.resolve_user(&bill.paid_by).display_name().to_owned();

        println!(
            "[{}] {} - {} ({}) paid by {}, due {}",
            bill.id,
            bill.description,
            bill.amount.format_dollars(),
            status_label(bill.status),
            payer,
            bill.due_date.format("%Y-%m-%d"),
        );
    }
}

async fn add_expense(session: &mut Session, opts: AddExpenseOpts) -> anyhow::Result<()> {
    let conversation = ConversationId::new(opts.conversation);
    let amount = Money::parse(&opts.amount)?;
    let paid_by = match opts.paid_by {
        Some(id) => UserId::new(id),
        None => session.user().id.clone(),
    };
    let owed_by = if opts.owed_by.is_empty() {
        default_owers(session, &conversation, &paid_by)
    } else {
        opts.owed_by.into_iter().map(UserId::new).collect()
    };

    let bill = session
        .record_expense(
            &conversation,
            NewExpenseData {
                description: opts.description,
                amount,
                category: opts.category,
                paid_by,
                owed_by,
            },
        )
        .await?;

    session
        .send_message(
            &conversation,
            MessageBody::BillReference {
                bill_id: bill.id.clone(),
            },
        )
        .await?;

    println!(
        "Recorded {} for {} (bill {}).",
        bill.amount.format_dollars(),
        bill.description,
        bill.id
    );

    Ok(())
}

/// Everyone in the conversation's group except the payer. Conversations
/// without a group have no implicit owers.
fn default_owers(
    session: &Session,
    conversation: &ConversationId,
    paid_by: &UserId,
) -> Vec<UserId> {
    session
        .groups()
        .iter()
        .find(|group| ConversationId::for_group(&group.id) == *conversation)
        .map(|group| {
            group
                .members
                .iter()
                .filter(|member| *member != paid_by)
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

async fn settle(session: &mut Session, opts: SettleOpts) -> anyhow::Result<()> {
    let bill_id = BillId::new(opts.bill);
    let (amount, description) = match session.bill(&bill_id) {
        Some(bill) => (bill.amount, bill.description.clone()),
        None => return Err(CoreError::not_found(EntityKind::Bill, &bill_id).into()),
    };

    let gateway: DynPaymentGateway = Arc::new(MockStripeGateway);
    let intent = gateway
        .create_bill_payment_intent(amount, &description)
        .await?;
    let status = gateway.confirm_payment(&intent.client_secret).await?;

    if status != "succeeded" {
        anyhow::bail!("payment was not accepted: {}", status);
    }

    match session.mark_bill_paid(&bill_id).await? {
        SettlementOutcome::Settled => {
            println!("Paid {} for {}.", amount.format_dollars(), description);
        }
        SettlementOutcome::AlreadyPaid => {
            println!("{} was already settled.", description);
        }
    }

    Ok(())
}

async fn groups(session: &mut Session, command: GroupsCommand) -> anyhow::Result<()> {
    match command {
        GroupsCommand::List => {
            for group in session.groups() {
                println!(
                    "[{}] {} - {} members, {} total",
                    group.id,
                    group.name,
                    group.members.len(),
                    group.total_expenses.format_dollars(),
                );
            }
        }
        GroupsCommand::Show(opts) => {
            let group_id = GroupId::new(opts.group);
            let group = session
                .group(&group_id)
                .ok_or_else(|| CoreError::not_found(EntityKind::Group, &group_id))?;

            println!("{} [{}]", group.name, group.id);
            if let Some(description) = &group.description {
                println!("{}", description);
            }
            println!("Total expenses: {}", group.total_expenses.format_dollars());

            for member in &group.members {
                let resolved = session.resolve_user(member);
                let name = resolved.display_name();
                let role = if group.is_admin(member) { " (admin)" } else { "" };
                println!("  [{}] {}{}", member, name, role);
            }
        }
        GroupsCommand::Create(opts) => {
            let members = opts.members.into_iter().map(UserId::new).collect();
            let group = session
                .create_group(&opts.name, opts.description, members)
                .await?;

            println!("Created group {} [{}].", group.name, group.id);
        }
        GroupsCommand::Rename(opts) => {
            let group_id = GroupId::new(opts.group);
            let actor = session.user().id.clone();
            session.rename_group(&group_id, &actor, &opts.name).await?;

            println!("Renamed group to {}.", opts.name.trim());
        }
        GroupsCommand::AddMembers(opts) => {
            let group_id = GroupId::new(opts.group);
            let actor = session.user().id.clone();
            let users = opts.users.into_iter().map(UserId::new).collect();
            session.add_members(&group_id, &actor, users).await?;

            println!("Added members.");
        }
        GroupsCommand::RemoveMember(opts) => {
            let group_id = GroupId::new(opts.group);
            let actor = session.user().id.clone();
            session
                .remove_member(&group_id, &actor, &UserId::new(opts.user))
                .await?;

            println!("Removed member.");
        }
        GroupsCommand::ToggleAdmin(opts) => {
            let group_id = GroupId::new(opts.group);
            let actor = session.user().id.clone();
            let is_admin = session
                .toggle_admin(&group_id, &actor, &UserId::new(opts.user))
                .await?;

            if is_admin {
                println!("Granted the admin role.");
            } else {
                println!("Revoked the admin role.");
            }
        }
        GroupsCommand::Leave(opts) => {
            let group_id = GroupId::new(opts.group);
            let actor = session.user().id.clone();

            match session.leave_group(&group_id, &actor).await? {
                LeaveOutcome::Left => println!("Left the group."),
                LeaveOutcome::DeletionRequired => {
                    println!("You are the only member; delete the group instead.");
                }
            }
        }
        GroupsCommand::Delete(opts) => {
            let group_id = GroupId::new(opts.group);
            let actor = session.user().id.clone();
            session.delete_group(&group_id, &actor).await?;

            println!("Deleted group.");
        }
    }

    Ok(())
}

async fn friends(session: &mut Session, command: FriendsCommand) -> anyhow::Result<()> {
    match command {
        FriendsCommand::List => {
            for friend in session.friends() {
                let phone = friend
                    .phone
                    .as_deref()
                    .map(|phone| format!(", {}", phone))
                    .unwrap_or_default();

                println!("[{}] {} <{}>{}", friend.id, friend.name, friend.email, phone);
            }
        }
        FriendsCommand::Add(opts) => {
            let friend = session
                .add_friend(NewFriendData {
                    name: opts.name,
                    email: opts.email,
                    phone: opts.phone,
                })
                .await?;

            println!("Added {} [{}].", friend.name, friend.id);
        }
        FriendsCommand::Remove(opts) => {
            session.remove_friend(&UserId::new(opts.friend)).await?;

            println!("Removed friend.");
        }
    }

    Ok(())
}

async fn chat(session: &mut Session, command: ChatCommand) -> anyhow::Result<()> {
    match command {
        ChatCommand::Send(opts) => {
            let conversation = ConversationId::new(opts.conversation);
            session
                .send_message(&conversation, MessageBody::Text { text: opts.text })
                .await?;

            println!("Sent.");
        }
        ChatCommand::History(opts) => {
            let conversation = ConversationId::new(opts.conversation);
            let messages = session
                .messages(&conversation)
                .ok_or_else(|| CoreError::not_found(EntityKind::Conversation, &conversation))?;

            for message in messages {
                let time = message.timestamp.format("%Y-%m-%d %H:%M");
                let name = match &message.sender {
                    Sender::System => "system".to_owned(),
                    Sender::User(id) => session.resolve_user(id).display_name().to_owned(),
                };

                match &message.body {
                    MessageBody::SystemNotice { text } => println!("-- {}", text),
                    MessageBody::Text { text } => println!("[{}] {}: {}", time, name, text),
                    MessageBody::BillReference { bill_id } => {
                        let label = match session.bill(bill_id) {
                            Some(bill) => format!(
                                "{} ({})",
                                bill.description,
                                bill.amount.format_dollars()
                            ),
                            None => bill_id.to_string(),
                        };
                        println!("[{}] {} shared a bill: {}", time, name, label);
                    }
                }
            }
        }
        ChatCommand::Direct(opts) => {
            let user = session.user().id.clone();
            let conversation = ConversationId::direct(&user, &UserId::new(opts.friend));
            session.start_conversation(&conversation).await?;

            println!("Conversation id: {}", conversation);
        }
    }

    Ok(())
}

fn activities(session: &Session) {
    for activity in session.activities() {
        println!(
            "[{}] {} ({})",
            kind_label(activity.kind),
            activity.description,
            activity.timestamp.format("%Y-%m-%d %H:%M"),
        );
    }
}

async fn profile(session: &mut Session, command: ProfileCommand) -> anyhow::Result<()> {
    match command {
        ProfileCommand::Show => {
            let user = session.user();

            println!("{} [{}]", user.name, user.id);
            println!("{}", user.email);
            println!("{}", user.avatar);
        }
        ProfileCommand::Update(opts) => {
            session
                .update_profile(ProfileUpdate {
                    name: opts.name,
                    email: opts.email,
                    avatar: opts.avatar,
                })
                .await?;

            println!("Profile updated.");
        }
        ProfileCommand::Logout => {
            session.logout().await?;

            println!("Signed out; the local profile was reset.");
        }
    }

    Ok(())
}

fn status_label(status: BillStatus) -> &'static str {
    match status {
        BillStatus::Pending => "pending",
        BillStatus::Paid => "paid",
    }
}

fn kind_label(kind: ActivityKind) -> &'static str {
    match kind {
        ActivityKind::Payment => "payment",
        ActivityKind::Expense => "expense",
        ActivityKind::Reminder => "reminder",
    }
}
