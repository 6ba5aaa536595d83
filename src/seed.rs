//! Deterministic first-run data.
//!
//! Each collection is generated when the store has no value for its key.
//! Everything is keyed by the current user id so the user appears in the
//! seeded groups and bills, and ids are fixed literals so reseeding with
//! the same inputs produces identical data.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::{
    groups::{Group, GroupId},
    identities::{Friend, UserId},
    ledger::domain::{
        activity::{Activity, ActivityId, ActivityKind},
        bills::{Bill, BillId, BillStatus},
        money::Money,
    },
    messaging::{ConversationId, Message, MessageBody, MessageId, Sender},
};

pub fn groups(user: &UserId) -> Vec<Group> {
    let group = |id: &str, name: &str, members: &[&UserId], total: i64, description: &str| Group {
        id: GroupId::new(id),
        name: name.to_owned(),
        description: Some(description.to_owned()),
        members: members.iter().map(|id| (*id).clone()).collect(),
        admins: vec![user.clone()],
        created_by: user.clone(),
        total_expenses: Money::from_minor(total),
    };

    let jane = UserId::new("2");
    let bob = UserId::new("3");
    let alice = UserId::new("4");
    let charlie = UserId::new("5");

    vec![
        group(
            "1",
            "Roommates",
            &[user, &jane, &bob],
            125_050,
            "Shared expenses for our apartment",
        ),
        group(
            "2",
            "Trip to Paris",
            &[user, &alice, &charlie],
            350_075,
            "Our 2023 Paris vacation expenses",
        ),
        group(
            "3",
            "Friday Dinner",
            &[user, &jane, &charlie],
            18_925,
            "Weekly dinner meetup expenses",
        ),
        group(
            "4",
            "Baseball Game",
            &[user, &jane, &alice, &bob],
            35_580,
            "Tickets and snacks for the baseball game",
        ),
        group(
            "5",
            "Beach House Rental",
            &[user, &jane, &bob, &alice, &charlie],
            175_000,
            "Summer beach house rental with friends",
        ),
        group(
            "6",
            "Concert Night",
            &[user, &bob],
            21_050,
            "Tickets and drinks for the rock concert",
        ),
    ]
}

pub fn friends() -> Vec<Friend> {
    let friend = |id: &str, name: &str, email: &str, avatar: &str, phone: &str| Friend {
        id: UserId::new(id),
        name: name.to_owned(),
        email: email.to_owned(),
        avatar: avatar.to_owned(),
        phone: Some(phone.to_owned()),
    };

    vec![
        friend(
            "2",
            "Jane Smith",
            "jane@example.com",
            "https://ui-avatars.com/api/?name=Jane+Smith",
            "555-1234",
        ),
        friend(
            "3",
            "Bob Johnson",
            "bob@example.com",
            "https://ui-avatars.com/api/?name=Bob+Johnson",
            "555-2345",
        ),
        friend(
            "4",
            "Alice Brown",
            "alice@example.com",
            "https://ui-avatars.com/api/?name=Alice+Brown",
            "555-3456",
        ),
        friend(
            "5",
            "Charlie Davis",
            "charlie@example.com",
            "https://ui-avatars.com/api/?name=Charlie+Davis",
            "555-4567",
        ),
    ]
}

pub fn conversations(
    user: &UserId,
    now: DateTime<Utc>,
) -> BTreeMap<ConversationId, Vec<Message>> {
    let message = |id: &str, sender: &UserId, text: &str, age: Duration| Message {
        id: MessageId::new(id),
        sender: Sender::User(sender.clone()),
        body: MessageBody::Text {
            text: text.to_owned(),
        },
        timestamp: now - age,
    };

    let jane = UserId::new("2");
    let bob = UserId::new("3");
    let alice = UserId::new("4");
    let charlie = UserId::new("5");

    let mut conversations = BTreeMap::new();

    conversations.insert(
        ConversationId::new("1"),
        vec![
            message(
                "1",
                &jane,
                "Hey everyone, I paid the electricity bill",
                Duration::days(1),
            ),
            message(
                "2",
                &bob,
                "Thanks! I'll send my part tonight",
                Duration::hours(12),
            ),
            message(
                "3",
                user,
                "No rush, I've added it to the expenses",
                Duration::hours(1),
            ),
        ],
    );

    conversations.insert(
        ConversationId::new("2"),
        vec![
            message(
                "1",
                user,
                "Everyone ready for Paris next month?",
                Duration::days(3),
            ),
            message("2", &alice, "Yes! So excited!", Duration::days(2)),
            message(
                "3",
                &charlie,
                "I've booked the Airbnb, will add to expenses",
                Duration::days(1),
            ),
        ],
    );

    conversations.insert(
        ConversationId::new("3"),
        vec![
            message("1", user, "Dinner at 8pm on Friday?", Duration::days(2)),
            message("2", &jane, "Sounds good!", Duration::days(1)),
            message("3", &charlie, "I'll make a reservation", Duration::hours(12)),
        ],
    );

    conversations.insert(
        ConversationId::new("4"),
        vec![
            message("1", &bob, "Where is everyone sitting?", Duration::days(4)),
            message(
                "2",
                user,
                "We're in Section 122, Row 15",
                Duration::hours(95),
            ),
            message(
                "3",
                &jane,
                "I'm getting snacks, anyone want anything?",
                Duration::hours(94),
            ),
        ],
    );

    conversations.insert(
        ConversationId::new("5"),
        vec![
            message(
                "1",
                user,
                "Beach house dates confirmed! June 15-20",
                Duration::days(6),
            ),
            message("2", &jane, "Perfect timing!", Duration::hours(143)),
            message(
                "3",
                &bob,
                "How are we splitting the cars?",
                Duration::hours(142),
            ),
        ],
    );

    conversations.insert(
        ConversationId::new("6"),
        vec![
            message(
                "1",
                user,
                "Got the concert tickets! $105 each",
                Duration::days(5),
            ),
            message(
                "2",
                &bob,
                "Awesome! I'll pay you right now",
                Duration::hours(119),
            ),
            message(
                "3",
                user,
                "We should grab dinner before the show",
                Duration::hours(118),
            ),
        ],
    );

    conversations
}

pub fn activities(_user: &UserId, now: DateTime<Utc>) -> Vec<Activity> {
    let activity = |id: &str, kind: ActivityKind, description: &str, age: Duration, conversation: &str| {
        Activity {
            id: ActivityId::new(id),
            kind,
            description: description.to_owned(),
            timestamp: now - age,
            conversation_id: ConversationId::new(conversation),
        }
    };

    vec![
        activity(
            "1",
            ActivityKind::Payment,
            "Jane paid $75 for electricity",
            Duration::days(1),
            "1",
        ),
        activity(
            "2",
            ActivityKind::Expense,
            "You added $189.25 for Friday dinner",
            Duration::hours(12),
            "3",
        ),
        activity(
            "3",
            ActivityKind::Payment,
            "Charlie paid you $95.50",
            Duration::hours(6),
            "2",
        ),
        activity(
            "4",
            ActivityKind::Reminder,
            "Bob owes you $45 for groceries",
            Duration::hours(2),
            "1",
        ),
    ]
}

pub fn pending_bills(user: &UserId, now: DateTime<Utc>) -> Vec<Bill> {
    let bill = |id: &str,
                description: &str,
                minor: i64,
                category: &str,
                due_in: Duration,
                conversation: &str,
                paid_by: &UserId,
                owed_by: &[&UserId]| Bill {
        id: BillId::new(id),
        description: description.to_owned(),
        amount: Money::from_minor(minor),
        category: category.to_owned(),
        paid_by: paid_by.clone(),
        owed_by: owed_by.iter().map(|id| (*id).clone()).collect(),
        conversation_id: ConversationId::new(conversation),
        timestamp: now,
        due_date: now + due_in,
        status: BillStatus::Pending,
        paid_date: None,
    };

    let jane = UserId::new("2");
    let bob = UserId::new("3");
    let alice = UserId::new("4");
    let charlie = UserId::new("5");

    vec![
        bill(
            "1",
            "Electricity Bill",
            7500,
            "utilities",
            Duration::days(7),
            "1",
            &jane,
            &[user, &bob],
        ),
        bill(
            "2",
            "Dinner at Ristorante",
            18_925,
            "food",
            Duration::days(3),
            "3",
            user,
            &[&jane, &charlie],
        ),
        bill(
            "3",
            "Airbnb Booking",
            120_000,
            "travel",
            Duration::days(14),
            "2",
            &charlie,
            &[user, &alice],
        ),
        bill(
            "4",
            "Baseball Tickets",
            24_500,
            "entertainment",
            Duration::days(2),
            "4",
            user,
            &[&jane, &bob, &alice],
        ),
        bill(
            "5",
            "Concert Tickets",
            21_050,
            "entertainment",
            Duration::days(5),
            "6",
            user,
            &[&bob],
        ),
        bill(
            "6",
            "Beach House Rental",
            175_000,
            "travel",
            Duration::days(16),
            "5",
            user,
            &[&jane, &bob, &alice, &charlie],
        ),
        bill(
            "7",
            "Internet Bill",
            6000,
            "utilities",
            Duration::days(12),
            "1",
            &bob,
            &[user, &jane],
        ),
        bill(
            "8",
            "Groceries",
            8735,
            "food",
            Duration::days(1),
            "1",
            user,
            &[&jane, &bob],
        ),
    ]
}
